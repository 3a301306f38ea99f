use crate::codec::{Activity, Direction, OrderKind};
use crate::types::{CityId, PlayerId, Turn, UnitId};
use serde::{Deserialize, Serialize};

/// What an activity works on. Indices are ruleset indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityTarget {
    None,
    Special(usize),
    Base(usize),
    Road(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub kind: OrderKind,
    /// Set for [`OrderKind::Move`].
    pub dir: Option<Direction>,
    /// Set for [`OrderKind::Activity`].
    pub activity: Option<Activity>,
    pub base: Option<usize>,
    pub road: Option<usize>,
}

impl Order {
    pub fn simple(kind: OrderKind) -> Self {
        Self { kind, dir: None, activity: None, base: None, road: None }
    }

    pub fn move_to(dir: Direction) -> Self {
        Self { dir: Some(dir), ..Self::simple(OrderKind::Move) }
    }

    pub fn activity(activity: Activity) -> Self {
        Self { activity: Some(activity), ..Self::simple(OrderKind::Activity) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOrders {
    pub index: usize,
    pub repeat: bool,
    pub vigilant: bool,
    pub last_move_safe: bool,
    pub list: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub unit_type: usize,
    pub x: usize,
    pub y: usize,
    pub facing: Direction,
    /// Player whose citizens make up the unit; the owner unless captured
    /// or bribed.
    pub nationality: PlayerId,
    pub veteran: i64,
    pub hp: i64,
    pub homecity: Option<CityId>,
    pub activity: Activity,
    pub activity_count: i64,
    pub activity_target: ActivityTarget,
    pub changed_from: Activity,
    pub changed_from_count: i64,
    pub changed_from_target: ActivityTarget,
    pub done_moving: bool,
    pub moves_left: i64,
    pub fuel: i64,
    pub birth_turn: Turn,
    pub battlegroup: i64,
    pub goto_tile: Option<(usize, usize)>,
    pub ai_controlled: bool,
    pub moved: bool,
    pub paradropped: bool,
    pub transported_by: Option<UnitId>,
    pub orders: Option<UnitOrders>,
}

impl Unit {
    pub fn new(id: UnitId, owner: PlayerId, unit_type: usize, x: usize, y: usize) -> Self {
        Self {
            id,
            unit_type,
            x,
            y,
            facing: Direction::South,
            nationality: owner,
            veteran: 0,
            hp: 10,
            homecity: None,
            activity: Activity::Idle,
            activity_count: 0,
            activity_target: ActivityTarget::None,
            changed_from: Activity::Idle,
            changed_from_count: 0,
            changed_from_target: ActivityTarget::None,
            done_moving: false,
            moves_left: 3,
            fuel: 0,
            birth_turn: 0,
            battlegroup: -1,
            goto_tile: None,
            ai_controlled: false,
            moved: false,
            paradropped: false,
            transported_by: None,
            orders: None,
        }
    }
}
