//! Hit testing and edge-handle resizing.

use serde::Serialize;

use super::viewport::Point;
use crate::template::{Field, Rect};

/// One of the four resize handles, sitting on the middle of each edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];
}

/// First field (declaration order) whose box contains `p`.
pub fn field_at<'a, I>(fields: I, p: Point) -> Option<&'a Field>
where
    I: IntoIterator<Item = &'a Field>,
{
    fields.into_iter().find(|f| f.rect().contains(p.x, p.y))
}

/// Which edge of `r` (screen space) the pointer grabs, if any.
///
/// An edge is grabbed when the pointer is within `tolerance` of the edge line
/// and within the edge's span (extended by the tolerance at the corners).
pub fn edge_at(r: Rect, p: Point, tolerance: f64) -> Option<Edge> {
    let within_x = p.x >= r.x - tolerance && p.x <= r.right() + tolerance;
    let within_y = p.y >= r.y - tolerance && p.y <= r.bottom() + tolerance;

    Edge::ALL.into_iter().find(|edge| match edge {
        Edge::Left => within_y && (p.x - r.x).abs() <= tolerance,
        Edge::Right => within_y && (p.x - r.right()).abs() <= tolerance,
        Edge::Top => within_x && (p.y - r.y).abs() <= tolerance,
        Edge::Bottom => within_x && (p.y - r.bottom()).abs() <= tolerance,
    })
}

/// Drag `edge` of `orig` by a template-space delta.
///
/// Left/top drags move the origin by the delta and shrink by the same amount,
/// so the opposite edge stays put. Sizes never drop below the minimums; when
/// clamping a left/top drag, the right/bottom edge is the anchor.
pub fn resize(orig: Rect, edge: Edge, dx: f64, dy: f64, min_width: f64, min_height: f64) -> Rect {
    match edge {
        Edge::Left => {
            let width = (orig.width - dx).max(min_width);
            Rect::new(orig.right() - width, orig.y, width, orig.height)
        }
        Edge::Right => Rect::new(orig.x, orig.y, (orig.width + dx).max(min_width), orig.height),
        Edge::Top => {
            let height = (orig.height - dy).max(min_height);
            Rect::new(orig.x, orig.bottom() - height, orig.width, height)
        }
        Edge::Bottom => Rect::new(orig.x, orig.y, orig.width, (orig.height + dy).max(min_height)),
    }
}

/// Keep a resized rectangle inside the canvas by pulling the dragged edge
/// back, never by moving the anchored one.
pub fn clamp_resized(r: Rect, edge: Edge, canvas_w: f64, canvas_h: f64) -> Rect {
    match edge {
        Edge::Left if r.x < 0.0 => Rect::new(0.0, r.y, r.right(), r.height),
        Edge::Right if r.right() > canvas_w => Rect::new(r.x, r.y, canvas_w - r.x, r.height),
        Edge::Top if r.y < 0.0 => Rect::new(r.x, 0.0, r.width, r.bottom()),
        Edge::Bottom if r.bottom() > canvas_h => Rect::new(r.x, r.y, r.width, canvas_h - r.y),
        _ => r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{FieldKind, Side};

    #[test]
    fn test_first_match_wins() {
        let a = Field::new("a", FieldKind::Text, Side::Front, Rect::new(0.0, 0.0, 100.0, 100.0));
        let b = Field::new("b", FieldKind::Text, Side::Front, Rect::new(50.0, 50.0, 100.0, 100.0));
        let fields = vec![a, b];

        assert_eq!(field_at(&fields, Point::new(75.0, 75.0)).unwrap().name, "a");
        assert_eq!(field_at(&fields, Point::new(125.0, 125.0)).unwrap().name, "b");
        assert!(field_at(&fields, Point::new(300.0, 300.0)).is_none());
    }

    #[test]
    fn test_edge_at() {
        let r = Rect::new(100.0, 100.0, 200.0, 50.0);
        assert_eq!(edge_at(r, Point::new(102.0, 120.0), 6.0), Some(Edge::Left));
        assert_eq!(edge_at(r, Point::new(298.0, 120.0), 6.0), Some(Edge::Right));
        assert_eq!(edge_at(r, Point::new(200.0, 97.0), 6.0), Some(Edge::Top));
        assert_eq!(edge_at(r, Point::new(200.0, 153.0), 6.0), Some(Edge::Bottom));
        assert_eq!(edge_at(r, Point::new(200.0, 125.0), 6.0), None);
        assert_eq!(edge_at(r, Point::new(102.0, 300.0), 6.0), None);
    }

    #[test]
    fn test_left_drag_moves_origin() {
        let r = resize(Rect::new(100.0, 100.0, 200.0, 50.0), Edge::Left, 30.0, 0.0, 50.0, 30.0);
        assert_eq!(r, Rect::new(130.0, 100.0, 170.0, 50.0));
    }

    #[test]
    fn test_top_drag_moves_origin() {
        let r = resize(Rect::new(100.0, 100.0, 200.0, 50.0), Edge::Top, 0.0, -20.0, 50.0, 30.0);
        assert_eq!(r, Rect::new(100.0, 80.0, 200.0, 70.0));
    }

    #[test]
    fn test_minimum_size_keeps_anchor() {
        let r = resize(Rect::new(100.0, 100.0, 200.0, 50.0), Edge::Left, 500.0, 0.0, 50.0, 30.0);
        assert_eq!(r, Rect::new(250.0, 100.0, 50.0, 50.0));

        let r = resize(Rect::new(100.0, 100.0, 200.0, 50.0), Edge::Bottom, 0.0, -100.0, 50.0, 30.0);
        assert_eq!(r, Rect::new(100.0, 100.0, 200.0, 30.0));
    }

    #[test]
    fn test_clamp_resized() {
        let r = clamp_resized(Rect::new(-20.0, 10.0, 120.0, 40.0), Edge::Left, 800.0, 600.0);
        assert_eq!(r, Rect::new(0.0, 10.0, 100.0, 40.0));
        let r = clamp_resized(Rect::new(700.0, 10.0, 150.0, 40.0), Edge::Right, 800.0, 600.0);
        assert_eq!(r, Rect::new(700.0, 10.0, 100.0, 40.0));
    }
}
