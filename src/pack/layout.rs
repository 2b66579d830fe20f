//! Sheet layout algorithms.
//!
//! Each algorithm assigns a top-left position to every image size it is
//! given. Padding is left between neighbours but not after the last row or
//! column, so the canvas is the tight bounding box of the placed images.

use crate::config::Algorithm;

/// Positions for a set of images, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub positions: Vec<(u32, u32)>,
    pub width: u32,
    pub height: u32,
}

impl Layout {
    fn from_positions(positions: Vec<(u32, u32)>, sizes: &[(u32, u32)]) -> Self {
        let width = positions
            .iter()
            .zip(sizes)
            .map(|(&(x, _), &(w, _))| x + w)
            .max()
            .unwrap_or(0);
        let height = positions
            .iter()
            .zip(sizes)
            .map(|(&(_, y), &(_, h))| y + h)
            .max()
            .unwrap_or(0);
        Self {
            positions,
            width,
            height,
        }
    }
}

/// Lay out images of the given `(width, height)` sizes.
pub fn layout(algorithm: Algorithm, sizes: &[(u32, u32)], padding: u32) -> Layout {
    let positions = match algorithm {
        Algorithm::TopDown => stack(sizes, padding, |(_, h)| (0, h)),
        Algorithm::LeftRight => stack(sizes, padding, |(w, _)| (w, 0)),
        Algorithm::Diagonal => stack(sizes, padding, |(w, h)| (w, h)),
        Algorithm::AltDiagonal => alt_diagonal(sizes, padding),
        Algorithm::BinaryTree => binary_tree(sizes, padding),
    };
    Layout::from_positions(positions, sizes)
}

/// Advance a cursor by `step(size) + padding` on the axes `step` uses.
fn stack(sizes: &[(u32, u32)], padding: u32, step: impl Fn((u32, u32)) -> (u32, u32)) -> Vec<(u32, u32)> {
    let mut cursor = (0u32, 0u32);
    sizes
        .iter()
        .map(|&size| {
            let position = cursor;
            let (dx, dy) = step(size);
            if dx > 0 {
                cursor.0 += dx + padding;
            }
            if dy > 0 {
                cursor.1 += dy + padding;
            }
            position
        })
        .collect()
}

fn alt_diagonal(sizes: &[(u32, u32)], padding: u32) -> Vec<(u32, u32)> {
    let total_width: u32 = sizes.iter().map(|&(w, _)| w + padding).sum::<u32>();
    let total_width = total_width.saturating_sub(padding);

    let mut x_used = 0u32;
    let mut y = 0u32;
    sizes
        .iter()
        .map(|&(w, h)| {
            let x = total_width - x_used - w;
            x_used += w + padding;
            let position = (x, y);
            y += h + padding;
            position
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Node {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    used: bool,
    right: Option<usize>,
    down: Option<usize>,
}

impl Node {
    fn free(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            used: false,
            right: None,
            down: None,
        }
    }
}

/// Growing binary-tree packer.
///
/// Blocks are placed largest side first. When no free region fits, the
/// root grows right or down, whichever keeps the sheet closer to square.
struct TreePacker {
    nodes: Vec<Node>,
    root: usize,
}

impl TreePacker {
    fn new(w: u32, h: u32) -> Self {
        Self {
            nodes: vec![Node::free(0, 0, w, h)],
            root: 0,
        }
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn find(&self, index: usize, w: u32, h: u32) -> Option<usize> {
        let node = &self.nodes[index];
        if node.used {
            node.right
                .and_then(|r| self.find(r, w, h))
                .or_else(|| node.down.and_then(|d| self.find(d, w, h)))
        } else if w <= node.w && h <= node.h {
            Some(index)
        } else {
            None
        }
    }

    fn split(&mut self, index: usize, w: u32, h: u32) -> (u32, u32) {
        let node = self.nodes[index];
        let down = self.push(Node::free(node.x, node.y + h, node.w, node.h - h));
        let right = self.push(Node::free(node.x + w, node.y, node.w - w, h));

        let node = &mut self.nodes[index];
        node.used = true;
        node.down = Some(down);
        node.right = Some(right);
        (node.x, node.y)
    }

    fn insert(&mut self, w: u32, h: u32) -> (u32, u32) {
        match self.find(self.root, w, h) {
            Some(index) => self.split(index, w, h),
            None => self.grow(w, h),
        }
    }

    fn grow(&mut self, w: u32, h: u32) -> (u32, u32) {
        let root = self.nodes[self.root];

        let can_grow_down = w <= root.w;
        let can_grow_right = h <= root.h;
        let should_grow_right = can_grow_right && root.h >= root.w + w;
        let should_grow_down = can_grow_down && root.w >= root.h + h;

        if should_grow_right || (can_grow_right && !should_grow_down) {
            self.grow_right(root, w, h)
        } else {
            self.grow_down(root, w, h)
        }
    }

    fn grow_right(&mut self, root: Node, w: u32, h: u32) -> (u32, u32) {
        let right = self.push(Node::free(root.w, 0, w, root.h));
        let new_root = self.push(Node {
            x: 0,
            y: 0,
            w: root.w + w,
            h: root.h,
            used: true,
            right: Some(right),
            down: Some(self.root),
        });
        self.root = new_root;
        self.split(right, w, h)
    }

    fn grow_down(&mut self, root: Node, w: u32, h: u32) -> (u32, u32) {
        // Widen when the block is wider than the sheet so growth always succeeds.
        let width = root.w.max(w);
        let down = self.push(Node::free(0, root.h, width, h));
        let new_root = self.push(Node {
            x: 0,
            y: 0,
            w: width,
            h: root.h + h,
            used: true,
            right: Some(self.root),
            down: Some(down),
        });
        self.root = new_root;
        self.split(down, w, h)
    }
}

fn binary_tree(sizes: &[(u32, u32)], padding: u32) -> Vec<(u32, u32)> {
    if sizes.is_empty() {
        return Vec::new();
    }

    // Largest side first; stable so equal blocks keep input order.
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let side = |i: usize| sizes[i].0.max(sizes[i].1);
        side(b).cmp(&side(a)).then_with(|| a.cmp(&b))
    });

    let padded = |i: usize| (sizes[i].0 + padding, sizes[i].1 + padding);
    let (w0, h0) = padded(order[0]);
    let mut packer = TreePacker::new(w0, h0);

    let mut positions = vec![(0, 0); sizes.len()];
    for &i in &order {
        let (w, h) = padded(i);
        positions[i] = packer.insert(w, h);
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_no_overlap(layout: &Layout, sizes: &[(u32, u32)]) {
        for i in 0..sizes.len() {
            for j in (i + 1)..sizes.len() {
                let (ax, ay) = layout.positions[i];
                let (bx, by) = layout.positions[j];
                let (aw, ah) = sizes[i];
                let (bw, bh) = sizes[j];
                let separate = bx >= ax + aw || ax >= bx + bw || by >= ay + ah || ay >= by + bh;
                assert!(separate, "images {} and {} overlap: {:?}", i, j, layout);
            }
        }
    }

    fn assert_within_canvas(layout: &Layout, sizes: &[(u32, u32)]) {
        for (&(x, y), &(w, h)) in layout.positions.iter().zip(sizes) {
            assert!(x + w <= layout.width && y + h <= layout.height, "{:?}", layout);
        }
    }

    const SIZES: [(u32, u32); 5] = [(10, 10), (20, 10), (5, 30), (16, 16), (8, 4)];

    #[test]
    fn test_empty_input() {
        for algorithm in Algorithm::ALL {
            let result = layout(algorithm, &[], 2);
            assert_eq!(result.width, 0);
            assert_eq!(result.height, 0);
            assert!(result.positions.is_empty());
        }
    }

    #[test]
    fn test_all_algorithms_place_without_overlap() {
        for padding in [0, 3] {
            for algorithm in Algorithm::ALL {
                let result = layout(algorithm, &SIZES, padding);
                assert_eq!(result.positions.len(), SIZES.len());
                assert_no_overlap(&result, &SIZES);
                assert_within_canvas(&result, &SIZES);
            }
        }
    }

    #[test]
    fn test_top_down() {
        let result = layout(Algorithm::TopDown, &[(10, 10), (20, 10)], 2);
        assert_eq!(result.positions, vec![(0, 0), (0, 12)]);
        assert_eq!((result.width, result.height), (20, 22));
    }

    #[test]
    fn test_left_right() {
        let result = layout(Algorithm::LeftRight, &[(10, 10), (20, 10)], 0);
        assert_eq!(result.positions, vec![(0, 0), (10, 0)]);
        assert_eq!((result.width, result.height), (30, 10));
    }

    #[test]
    fn test_diagonal() {
        let result = layout(Algorithm::Diagonal, &[(10, 10), (20, 10)], 1);
        assert_eq!(result.positions, vec![(0, 0), (11, 11)]);
        assert_eq!((result.width, result.height), (31, 21));
    }

    #[test]
    fn test_alt_diagonal() {
        let result = layout(Algorithm::AltDiagonal, &[(10, 10), (20, 10)], 0);
        assert_eq!(result.positions, vec![(20, 0), (0, 10)]);
        assert_eq!((result.width, result.height), (30, 20));
    }

    #[test]
    fn test_binary_tree_single_image() {
        let result = layout(Algorithm::BinaryTree, &[(7, 3)], 4);
        assert_eq!(result.positions, vec![(0, 0)]);
        assert_eq!((result.width, result.height), (7, 3));
    }

    #[test]
    fn test_binary_tree_fills_gaps() {
        // Four equal squares should pack into a 2x2 grid.
        let sizes = [(8, 8); 4];
        let result = layout(Algorithm::BinaryTree, &sizes, 0);
        assert_no_overlap(&result, &sizes);
        assert_eq!((result.width, result.height), (16, 16));
    }

    #[test]
    fn test_binary_tree_wider_block_after_taller() {
        // The second block is wider than the sheet and taller than free space.
        let sizes = [(4, 40), (30, 35)];
        let result = layout(Algorithm::BinaryTree, &sizes, 0);
        assert_no_overlap(&result, &sizes);
        assert_within_canvas(&result, &sizes);
    }
}
