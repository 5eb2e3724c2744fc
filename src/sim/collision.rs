//! Proximity checks between the robot and reef objects
//!
//! Everything is a circle in canvas pixels. Radii already carry the layout
//! scale, so both sides of every comparison live in the same space.

use glam::Vec2;

use super::state::{CoralPiece, TrashItem};
use crate::consts::{ROBOT_RADIUS, TRASH_RADIUS};

/// Result of a proximity check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Index into the checked slice
    pub index: usize,
    /// Centre distance
    pub distance: f32,
    /// How far the circles overlap
    pub penetration: f32,
}

/// Robot collision radius for a layout factor
#[inline]
pub fn robot_radius(layout_factor: f32) -> f32 {
    ROBOT_RADIUS * layout_factor
}

/// Current pickup radius of a trash item (tracks its pop-in scale)
#[inline]
pub fn trash_radius(item: &TrashItem, layout_factor: f32) -> f32 {
    TRASH_RADIUS * layout_factor * item.scale
}

/// Strict circle overlap: touching edges do not count
fn contact(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32, index: usize) -> Option<Contact> {
    let distance = a.distance(b);
    let reach = radius_a + radius_b;
    (distance < reach).then_some(Contact {
        index,
        distance,
        penetration: reach - distance,
    })
}

/// Uncollected trash within pickup range of the robot
pub fn trash_in_reach(
    robot_pos: Vec2,
    layout_factor: f32,
    trash: &[TrashItem],
) -> Vec<Contact> {
    let robot_r = robot_radius(layout_factor);
    trash
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.is_collected)
        .filter_map(|(i, item)| {
            contact(robot_pos, robot_r, item.pos, trash_radius(item, layout_factor), i)
        })
        .collect()
}

/// First coral piece the robot overlaps, if any
pub fn coral_contact(robot_pos: Vec2, layout_factor: f32, coral: &[CoralPiece]) -> Option<Contact> {
    let robot_r = robot_radius(layout_factor);
    coral
        .iter()
        .enumerate()
        .find_map(|(i, piece)| contact(robot_pos, robot_r, piece.pos, piece.radius, i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::TrashKind;

    fn trash(pos: Vec2, scale: f32) -> TrashItem {
        TrashItem {
            id: 1,
            pos,
            kind: TrashKind::Can,
            scale,
            target_scale: scale,
            float_offset: 0.0,
            is_collected: false,
        }
    }

    #[test]
    fn test_touching_coral_is_not_contact() {
        let coral = [CoralPiece {
            pos: Vec2::new(35.0, 0.0),
            radius: 15.0,
            color: 0xff7f50,
        }];
        // 20 + 15 = 35: edges touch exactly
        assert!(coral_contact(Vec2::ZERO, 1.0, &coral).is_none());
        assert!(coral_contact(Vec2::new(1.0, 0.0), 1.0, &coral).is_some());
    }

    #[test]
    fn test_trash_reach_uses_current_scale() {
        let robot = Vec2::new(100.0, 100.0);
        // 20 (robot) + 12 (trash at full scale) = 32
        let items = [trash(Vec2::new(130.0, 100.0), 1.0)];
        assert_eq!(trash_in_reach(robot, 1.0, &items).len(), 1);

        // Same spot, still popping in
        let items = [trash(Vec2::new(130.0, 100.0), 0.1)];
        assert!(trash_in_reach(robot, 1.0, &items).is_empty());
    }

    #[test]
    fn test_collected_trash_is_skipped() {
        let mut item = trash(Vec2::new(100.0, 100.0), 1.0);
        item.is_collected = true;
        assert!(trash_in_reach(Vec2::new(100.0, 100.0), 1.0, &[item]).is_empty());
    }

    #[test]
    fn test_coral_contact_scales_robot() {
        let coral = [CoralPiece {
            pos: Vec2::new(0.0, 0.0),
            radius: 15.0,
            color: 0xff7f50,
        }];
        let robot = Vec2::new(40.0, 0.0);
        // 20 + 15 = 35 < 40 at normal scale
        assert!(coral_contact(robot, 1.0, &coral).is_none());
        // 30 + 15 = 45 > 40 enlarged
        let hit = coral_contact(robot, 1.5, &coral).unwrap();
        assert_eq!(hit.index, 0);
        assert!((hit.penetration - 5.0).abs() < 1e-4);
    }
}
