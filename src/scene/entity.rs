//! Scene graph nodes

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use super::element::Element;
use super::script::{GhostParams, Keyframe, Pose, Script};
use crate::actions::Actions;
use crate::locking_list::LockingList;
use crate::surface::Color;

/// Custom per-frame logic: `(entity, elapsed_ms, actions)`
pub type UpdateHook = Box<dyn FnMut(&mut Entity, f32, &mut Actions)>;
/// Runs once when an entity's script completes
pub type EndedHook = Box<dyn FnOnce(&mut Actions)>;

/// Ordered child list; mutations made while it is being traversed are deferred
pub type EntityList = LockingList<EntityRef>;

/// A positioned, sizeable node that owns drawable elements and child entities.
///
/// Children are positioned in the parent's coordinate frame after the parent's
/// translate/scale/rotate.
pub struct Entity {
    pub position: Vec2,
    pub size: Vec2,
    /// Rotation in radians
    pub angle: f32,
    /// 0.0 - 1.0; at or below zero the subtree is not drawn (but still updated)
    pub opacity: f32,
    pub color: Option<Color>,
    pub elements: Vec<Element>,
    /// Removed by the parent on its next update pass
    pub dead: bool,
    children: Rc<EntityList>,
    script: Option<Script>,
    on_update: Option<UpdateHook>,
    on_ended: Option<EndedHook>,
}

impl Default for Entity {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            size: Vec2::ONE,
            angle: 0.0,
            opacity: 1.0,
            color: Some(Color::WHITE),
            elements: Vec::new(),
            dead: false,
            children: Rc::new(EntityList::new()),
            script: None,
            on_update: None,
            on_ended: None,
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("position", &self.position)
            .field("size", &self.size)
            .field("angle", &self.angle)
            .field("opacity", &self.opacity)
            .field("elements", &self.elements.len())
            .field("children", &self.children.len())
            .field("dead", &self.dead)
            .field("scripted", &self.script.is_some())
            .finish()
    }
}

impl Entity {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Vec2::new(width, height);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_element(mut self, element: impl Into<Element>) -> Self {
        self.elements.push(element.into());
        self
    }

    pub fn with_update(mut self, hook: impl FnMut(&mut Entity, f32, &mut Actions) + 'static) -> Self {
        self.on_update = Some(Box::new(hook));
        self
    }

    /// An entity driven by keyframes, drawing `elements` with `color`.
    /// Panics if `steps` is empty.
    pub fn scripted(
        elements: Vec<Element>,
        color: Option<Color>,
        steps: Vec<Keyframe>,
        repeat: bool,
        ended: Option<EndedHook>,
    ) -> Self {
        let script = Script::new(steps, repeat);
        let mut entity = Self {
            elements,
            color,
            on_ended: ended,
            ..Default::default()
        };
        entity.apply_pose(&script.initial_pose());
        entity.script = Some(script);
        entity
    }

    /// A one-shot grow/shrink-and-fade copy of `source`'s elements.
    /// The ghost removes itself (dead flag) when the animation finishes.
    pub fn ghost(source: &Entity, params: GhostParams, ended: Option<EndedHook>) -> Self {
        let steps = params.keyframes(&source.pose());
        Self::scripted(source.elements.clone(), source.color, steps, false, ended)
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            size: self.size,
            angle: self.angle,
            opacity: self.opacity,
        }
    }

    pub fn apply_pose(&mut self, pose: &Pose) {
        self.position = pose.position;
        self.size = pose.size;
        self.angle = pose.angle;
        self.opacity = pose.opacity;
    }

    pub fn script(&self) -> Option<&Script> {
        self.script.as_ref()
    }

    pub fn children(&self) -> &Rc<EntityList> {
        &self.children
    }

    /// Append a child (deferred if the child list is being traversed)
    pub fn add_child(&self, child: impl Into<EntityRef>) -> EntityRef {
        let child = child.into();
        self.children.append(child.clone());
        child
    }

    pub fn remove_child(&self, child: &EntityRef) {
        self.children.remove(child);
    }

    /// Advance script, custom logic, then children by `ms` milliseconds
    pub fn update(&mut self, ms: f32, actions: &mut Actions) {
        if let Some(script) = self.script.as_mut() {
            if !script.is_completed() {
                let step = script.advance(ms);
                self.apply_pose(&step.pose);
                if step.just_completed {
                    if let Some(ended) = self.on_ended.take() {
                        ended(actions);
                    }
                    self.dead = true;
                }
            }
        }

        if let Some(mut hook) = self.on_update.take() {
            hook(self, ms, actions);
            // The hook may have installed a replacement
            if self.on_update.is_none() {
                self.on_update = Some(hook);
            }
        }

        self.update_children(ms, actions);
    }

    pub fn update_children(&self, ms: f32, actions: &mut Actions) {
        update_list(&self.children, ms, actions);
    }
}

/// Update every entity in `list`, removing those that end up dead
pub fn update_list(list: &EntityList, ms: f32, actions: &mut Actions) {
    list.for_each(|child| {
        let dead = {
            let mut entity = child.borrow_mut();
            entity.update(ms, actions);
            entity.dead
        };
        if dead {
            list.remove(child);
        }
    });
}

/// Shared handle to an entity; equality is identity
#[derive(Clone)]
pub struct EntityRef(Rc<RefCell<Entity>>);

impl EntityRef {
    pub fn new(entity: Entity) -> Self {
        Self(Rc::new(RefCell::new(entity)))
    }

    pub fn borrow(&self) -> Ref<'_, Entity> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Entity> {
        self.0.borrow_mut()
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(entity) => entity.fmt(f),
            Err(_) => f.write_str("Entity(<borrowed>)"),
        }
    }
}

impl From<Entity> for EntityRef {
    fn from(entity: Entity) -> Self {
        Self::new(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::element::Rectangle;
    use std::cell::Cell;

    #[test]
    fn test_dead_child_removed_on_parent_update() {
        let parent = Entity::new(0.0, 0.0);
        let child = parent.add_child(Entity::new(1.0, 1.0));
        parent.add_child(Entity::new(2.0, 2.0));

        child.borrow_mut().dead = true;
        assert_eq!(parent.children().len(), 2);

        let mut actions = Actions::new();
        parent.update_children(16.0, &mut actions);
        assert_eq!(parent.children().len(), 1);
        assert!(!parent.children().contains(&child));
    }

    #[test]
    fn test_child_spawning_sibling_is_deferred() {
        let parent = Entity::new(0.0, 0.0);
        let siblings = Rc::clone(parent.children());
        let updates = Rc::new(Cell::new(0));

        let spawner = {
            let updates = updates.clone();
            Entity::new(0.0, 0.0).with_update(move |_, _, _| {
                updates.set(updates.get() + 1);
                let updates = updates.clone();
                siblings.append(EntityRef::new(Entity::default().with_update(
                    move |_, _, _| updates.set(updates.get() + 100),
                )));
            })
        };
        parent.add_child(spawner);

        let mut actions = Actions::new();
        parent.update_children(16.0, &mut actions);
        // The spawned sibling was not updated in the same pass
        assert_eq!(updates.get(), 1);
        assert_eq!(parent.children().len(), 2);

        parent.update_children(16.0, &mut actions);
        assert_eq!(updates.get(), 1 + 1 + 100);
    }

    #[test]
    fn test_scripted_entity_marks_dead_and_fires_ended_once() {
        let ended = Rc::new(Cell::new(0));
        let flag = ended.clone();
        let mut entity = Entity::scripted(
            vec![Rectangle::default().into()],
            None,
            vec![
                Keyframe::from_array([0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0]),
                Keyframe::from_array([1000.0, 10.0, 0.0, 1.0, 1.0, 0.0, 1.0]),
            ],
            false,
            Some(Box::new(move |_| flag.set(flag.get() + 1))),
        );

        let mut actions = Actions::new();
        entity.update(500.0, &mut actions);
        assert!((entity.position.x - 5.0).abs() < 1e-4);
        assert!(!entity.dead);

        entity.update(1000.0, &mut actions);
        entity.update(1.0, &mut actions);
        assert!(entity.dead);
        assert_eq!(ended.get(), 1);
        assert!((entity.position.x - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_ghost_end_to_end() {
        let parent = Entity::new(0.0, 0.0);
        let source = Entity::new(0.0, 0.0).with_element(Rectangle::default());
        let ghost = parent.add_child(Entity::ghost(&source, GhostParams::outward(500.0, 5.0), None));

        let mut actions = Actions::new();
        parent.update_children(250.0, &mut actions);
        {
            let g = ghost.borrow();
            assert!((g.size.x - 3.0).abs() < 1e-4);
            assert!((g.opacity - 0.5).abs() < 1e-4);
        }

        parent.update_children(500.0, &mut actions);
        assert!(ghost.borrow().dead);
        assert!(parent.children().is_empty());
    }
}
