//! Interaction routing and observer isolation.

use super::*;
use crate::entity::{EntityKind, ReplicatedEntity};
use crate::error::InteractionError;
use crate::interaction::InteractionAction;
use crate::protocol::RawInteraction;

type Seen = Arc<Mutex<Vec<(ViewerId, EntityId, InteractionAction)>>>;

fn recorder(
    seen: &Seen,
) -> impl Fn(ViewerId, &ReplicatedEntity, InteractionAction) -> Result<(), InteractionError> + Send + Sync + 'static
{
    let seen = seen.clone();
    move |viewer: ViewerId, entity: &ReplicatedEntity, action: InteractionAction| {
        seen.lock().unwrap().push((viewer, entity.id(), action));
        Ok(())
    }
}

#[test]
fn test_two_observers_both_notified() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let npc = coordinator.create_player("Banker", at(0.0));
    let id = coordinator.entity(npc).unwrap().id();
    let seen: Seen = Arc::default();
    coordinator.add_observer(npc, recorder(&seen)).unwrap();
    coordinator.add_observer(npc, recorder(&seen)).unwrap();
    coordinator.spawn(npc).unwrap();

    assert!(coordinator.on_interaction_received(viewer, id, RawInteraction::from(1)));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (viewer, id, InteractionAction::Primary),
            (viewer, id, InteractionAction::Primary)
        ]
    );

    seen.lock().unwrap().clear();
    assert!(coordinator.on_interaction_received(viewer, id, RawInteraction::Interact));
    assert!(seen
        .lock()
        .unwrap()
        .iter()
        .all(|(_, _, action)| *action == InteractionAction::Secondary));
    assert_eq!(coordinator.stats().interactions_routed, 2);
}

#[test]
fn test_unmapped_types_are_consumed_silently() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    let id = coordinator.entity(zombie).unwrap().id();
    let seen: Seen = Arc::default();
    coordinator.add_observer(zombie, recorder(&seen)).unwrap();
    coordinator.spawn(zombie).unwrap();

    assert!(coordinator.on_interaction_received(viewer, id, RawInteraction::InteractAt));
    assert!(coordinator.on_interaction_received(viewer, id, RawInteraction::from(42)));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_unregistered_targets_pass_through() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    let id = coordinator.entity(zombie).unwrap().id();

    // Not spawned yet
    assert!(!coordinator.on_interaction_received(viewer, id, RawInteraction::Attack));

    coordinator.spawn(zombie).unwrap();
    assert!(coordinator.on_interaction_received(viewer, id, RawInteraction::Attack));

    coordinator.despawn(zombie).unwrap();
    assert!(!coordinator.on_interaction_received(viewer, id, RawInteraction::Attack));

    // A host-simulated entity id is never ours
    assert!(!coordinator.on_interaction_received(viewer, EntityId(7), RawInteraction::Attack));
}

#[test]
fn test_failing_and_panicking_observers_are_isolated() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    let id = coordinator.entity(zombie).unwrap().id();
    let seen: Seen = Arc::default();

    coordinator
        .add_observer(
            zombie,
            |_: ViewerId, _: &ReplicatedEntity, _: InteractionAction| -> Result<(), InteractionError> {
                Err(InteractionError::Handler("shop closed".to_string()))
            },
        )
        .unwrap();
    coordinator
        .add_observer(
            zombie,
            |_: ViewerId, _: &ReplicatedEntity, _: InteractionAction| -> Result<(), InteractionError> {
                panic!("observer bug")
            },
        )
        .unwrap();
    coordinator.add_observer(zombie, recorder(&seen)).unwrap();
    coordinator.spawn(zombie).unwrap();

    assert!(coordinator.on_interaction_received(viewer, id, RawInteraction::Attack));
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(coordinator.stats().observer_failures, 2);
}

#[test]
fn test_removed_observer_is_not_called() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    let id = coordinator.entity(zombie).unwrap().id();
    let seen: Seen = Arc::default();
    let first = coordinator.add_observer(zombie, recorder(&seen)).unwrap();
    let second = coordinator.add_observer(zombie, recorder(&seen)).unwrap();
    assert_ne!(first, second);
    coordinator.spawn(zombie).unwrap();

    assert!(coordinator.remove_observer(zombie, first).unwrap());
    assert!(!coordinator.remove_observer(zombie, first).unwrap());
    assert_eq!(coordinator.entity(zombie).unwrap().observer_count(), 1);

    coordinator.on_interaction_received(viewer, id, RawInteraction::Attack);
    assert_eq!(seen.lock().unwrap().len(), 1);
}
