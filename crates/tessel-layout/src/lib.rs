// SPDX-License-Identifier: MIT
//
// tessel-layout: the retained node tree and the flex layout pass.
//
// A `Tree<W>` owns nodes that carry a widget payload `W` plus layout
// properties. `LayoutEngine::compute` turns those properties into screen
// rectangles. The crate knows nothing about painting or terminals; the
// only thing it asks of a widget is its content size, through `Measure`.

pub mod engine;
pub mod geometry;
pub mod style;
pub mod tree;

pub use engine::LayoutEngine;
pub use geometry::{Edges, Rect, Size};
pub use style::{Align, Dimension, Direction, Justify, LayoutStyle, ParseDimensionError};
pub use tree::{Measure, Node, NodeId, Tree, TreeError};
