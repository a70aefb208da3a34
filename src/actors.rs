use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::config::ActorTuning;
use crate::map::TileCoord;
use crate::resources::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// Anything that can carry an order: a single unit or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ActorId {
    Unit(UnitId),
    Group(GroupId),
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorId::Unit(id) => id.fmt(f),
            ActorId::Group(id) => id.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Citizen,
    Scout,
    Hunter,
}

impl UnitKind {
    pub const ALL: [UnitKind; 3] = [UnitKind::Citizen, UnitKind::Scout, UnitKind::Hunter];

    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Citizen => "citizen",
            UnitKind::Scout => "scout",
            UnitKind::Hunter => "hunter",
        }
    }
}

/// Current task of an actor together with the progress that only makes
/// sense for that task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "order", rename_all = "snake_case")]
pub enum Order {
    #[default]
    Idle,
    Explore {
        #[serde(default)]
        target: Option<TileCoord>,
        #[serde(default)]
        remaining: f64,
    },
    Harvest {
        resource: ResourceKind,
        #[serde(default)]
        carry: f64,
    },
    Build {
        building: BuildingKind,
        remaining: f64,
    },
}

impl Order {
    pub fn explore() -> Self {
        Order::Explore {
            target: None,
            remaining: 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Order::Idle => "idle",
            Order::Explore { .. } => "explore",
            Order::Harvest { .. } => "harvest",
            Order::Build { .. } => "build",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Order::Idle)
    }
}

/// Shared order state machine surface of units and groups.
pub trait Actor {
    fn actor_id(&self) -> ActorId;
    fn order(&self) -> &Order;
    fn order_mut(&mut self) -> &mut Order;
    fn speed(&self, tuning: &ActorTuning) -> f64;
    fn explore_base_secs(&self, tuning: &ActorTuning) -> f64;

    fn set_order(&mut self, order: Order) {
        *self.order_mut() = order;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub kind: UnitKind,
    #[serde(default)]
    pub order: Order,
}

impl Actor for Unit {
    fn actor_id(&self) -> ActorId {
        ActorId::Unit(self.id)
    }

    fn order(&self) -> &Order {
        &self.order
    }

    fn order_mut(&mut self) -> &mut Order {
        &mut self.order
    }

    fn speed(&self, tuning: &ActorTuning) -> f64 {
        tuning.unit_speed(self.kind)
    }

    fn explore_base_secs(&self, tuning: &ActorTuning) -> f64 {
        tuning.unit_explore_secs
    }
}

/// A named set of units acting as one formation.
///
/// Membership does not take the units over; members stay individually
/// orderable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub members: BTreeSet<UnitId>,
    #[serde(default)]
    pub order: Order,
}

impl Actor for Group {
    fn actor_id(&self) -> ActorId {
        ActorId::Group(self.id)
    }

    fn order(&self) -> &Order {
        &self.order
    }

    fn order_mut(&mut self) -> &mut Order {
        &mut self.order
    }

    fn speed(&self, tuning: &ActorTuning) -> f64 {
        tuning.group_speed
    }

    fn explore_base_secs(&self, tuning: &ActorTuning) -> f64 {
        tuning.group_explore_secs
    }
}

fn first_id() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRegistry {
    #[serde(default)]
    units: Vec<Unit>,
    #[serde(default)]
    groups: Vec<Group>,
    #[serde(default = "first_id")]
    next_unit_id: u32,
    #[serde(default = "first_id")]
    next_group_id: u32,
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self {
            units: Vec::new(),
            groups: Vec::new(),
            next_unit_id: first_id(),
            next_group_id: first_id(),
        }
    }
}

impl ActorRegistry {
    pub fn spawn_unit(&mut self, kind: UnitKind) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        self.units.push(Unit {
            id,
            kind,
            order: Order::Idle,
        });
        id
    }

    /// Callers validate membership; this only allocates the id.
    pub fn insert_group(&mut self, name: Option<String>, members: BTreeSet<UnitId>) -> GroupId {
        let id = GroupId(self.next_group_id);
        self.next_group_id += 1;
        self.groups.push(Group {
            id,
            name: name.unwrap_or_else(|| format!("Group {}", id.0)),
            members,
            order: Order::Idle,
        });
        id
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn actor(&self, id: ActorId) -> Option<&dyn Actor> {
        match id {
            ActorId::Unit(id) => self.unit(id).map(|unit| unit as &dyn Actor),
            ActorId::Group(id) => self.group(id).map(|group| group as &dyn Actor),
        }
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut dyn Actor> {
        match id {
            ActorId::Unit(id) => self
                .units
                .iter_mut()
                .find(|unit| unit.id == id)
                .map(|unit| unit as &mut dyn Actor),
            ActorId::Group(id) => self
                .groups
                .iter_mut()
                .find(|group| group.id == id)
                .map(|group| group as &mut dyn Actor),
        }
    }

    /// Every actor id, units first, each kind in id order.
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.units
            .iter()
            .map(|unit| ActorId::Unit(unit.id))
            .chain(self.groups.iter().map(|group| ActorId::Group(group.id)))
            .collect()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn unit_count(&self, kind: UnitKind) -> usize {
        self.units.iter().filter(|unit| unit.kind == kind).count()
    }

    /// Raises both id counters above every stored id. Saves written without
    /// counters would otherwise hand out ids that are already taken.
    pub fn reconcile_counters(&mut self) {
        if let Some(max) = self.units.iter().map(|unit| unit.id.0).max() {
            self.next_unit_id = self.next_unit_id.max(max.saturating_add(1));
        }
        if let Some(max) = self.groups.iter().map(|group| group.id.0).max() {
            self.next_group_id = self.next_group_id.max(max.saturating_add(1));
        }
    }

    pub fn next_unit_id(&self) -> u32 {
        self.next_unit_id
    }

    pub fn next_group_id(&self) -> u32 {
        self.next_group_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_per_kind() {
        let mut registry = ActorRegistry::default();
        let a = registry.spawn_unit(UnitKind::Citizen);
        let b = registry.spawn_unit(UnitKind::Scout);
        let g = registry.insert_group(None, [a, b].into_iter().collect());
        assert_eq!(a, UnitId(1));
        assert_eq!(b, UnitId(2));
        assert_eq!(g, GroupId(1));
        assert_eq!(registry.group(g).unwrap().name, "Group 1");
        assert_eq!(registry.next_unit_id(), 3);
        assert_eq!(registry.next_group_id(), 2);
    }

    #[test]
    fn group_and_member_orders_are_independent() {
        let mut registry = ActorRegistry::default();
        let unit = registry.spawn_unit(UnitKind::Hunter);
        let group = registry.insert_group(None, [unit].into_iter().collect());

        registry
            .actor_mut(ActorId::Group(group))
            .unwrap()
            .set_order(Order::explore());
        assert!(registry.unit(unit).unwrap().order.is_idle());

        registry
            .actor_mut(ActorId::Unit(unit))
            .unwrap()
            .set_order(Order::Harvest {
                resource: ResourceKind::Food,
                carry: 0.0,
            });
        assert_eq!(registry.group(group).unwrap().order.name(), "explore");
    }

    #[test]
    fn reconciled_counters_never_reuse_stored_ids() {
        let mut registry: ActorRegistry = serde_json::from_str(
            r#"{"units":[{"id":1,"kind":"citizen"},{"id":2,"kind":"hunter"}]}"#,
        )
        .unwrap();
        registry.reconcile_counters();
        let spawned = registry.spawn_unit(UnitKind::Hunter);
        assert_eq!(spawned, UnitId(3));
        assert_eq!(registry.next_group_id(), 1);

        registry
            .actor_mut(ActorId::Unit(spawned))
            .unwrap()
            .set_order(Order::explore());
        let orders: Vec<(u32, &str)> = registry
            .units()
            .iter()
            .map(|unit| (unit.id.0, unit.order.name()))
            .collect();
        assert_eq!(orders, vec![(1, "idle"), (2, "idle"), (3, "explore")]);
    }

    #[test]
    fn reconcile_keeps_counters_that_are_already_ahead() {
        let mut registry = ActorRegistry::default();
        registry.spawn_unit(UnitKind::Citizen);
        registry.spawn_unit(UnitKind::Citizen);
        registry.reconcile_counters();
        assert_eq!(registry.next_unit_id(), 3);
    }

    #[test]
    fn actor_id_serializes_with_kind_tag() {
        let json = serde_json::to_string(&ActorId::Group(GroupId(4))).unwrap();
        assert_eq!(json, r#"{"kind":"group","id":4}"#);
    }
}
