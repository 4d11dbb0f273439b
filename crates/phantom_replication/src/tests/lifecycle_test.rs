//! Entity lifecycle: create, spawn, move, despawn, remove.

use super::*;
use crate::entity::EntityKind;
use crate::error::ReplicationError;
use crate::metadata::HEALTH;
use crate::protocol::{EntityStatus, MetadataValue, PlayerInfoAction};
use crate::types::{BlockPos, Velocity};

#[test]
fn test_spawn_reaches_same_world_viewers_in_range() {
    let (host, mut coordinator) = setup();
    let near = host.add_viewer(OVERWORLD, 10.0);
    let far_but_in_range = host.add_viewer(OVERWORLD, 50.0);
    let elsewhere = host.add_viewer(NETHER, 0.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    coordinator.spawn(zombie).unwrap();

    let entity = coordinator.entity(zombie).unwrap();
    assert!(entity.is_spawned());
    assert_eq!(entity.viewer_count(), 2);
    assert!(entity.is_viewed_by(near));
    assert!(entity.is_viewed_by(far_but_in_range));
    assert!(!entity.is_viewed_by(elsewhere));
    assert!(host.packets(elsewhere).is_empty());

    match &host.packets(near)[0] {
        Packet::Spawn { type_name, metadata, .. } => {
            assert_eq!(type_name, "zombie");
            assert!(metadata
                .iter()
                .any(|field| field.index == HEALTH && field.value == MetadataValue::Float(20.0)));
        }
        other => panic!("expected spawn, got {:?}", other),
    }
    assert_eq!(coordinator.stats().spawns, 2);
}

#[test]
fn test_spawn_sequence_for_mob() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 5.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    coordinator.spawn(zombie).unwrap();

    assert_eq!(host.packet_names(viewer), vec!["spawn", "head_rotation"]);
}

#[test]
fn test_spawn_twice_sends_once() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 5.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    coordinator.spawn(zombie).unwrap();
    coordinator.spawn(zombie).unwrap();
    coordinator.on_viewer_moved(viewer);

    assert_eq!(host.count(viewer, "spawn"), 1);
}

#[test]
fn test_despawn_is_idempotent() {
    let (host, mut coordinator) = setup();
    let a = host.add_viewer(OVERWORLD, 5.0);
    let b = host.add_viewer(OVERWORLD, -5.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    coordinator.spawn(zombie).unwrap();
    coordinator.despawn(zombie).unwrap();
    coordinator.despawn(zombie).unwrap();

    assert_eq!(host.count(a, "despawn"), 1);
    assert_eq!(host.count(b, "despawn"), 1);
    let entity = coordinator.entity(zombie).unwrap();
    assert!(!entity.is_spawned());
    assert_eq!(entity.viewer_count(), 0);
}

#[test]
fn test_player_info_wraps_spawn_and_despawn() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 5.0);

    let npc = coordinator.create_player("Shopkeeper", at(0.0));
    coordinator.spawn(npc).unwrap();

    let packets = host.packets(viewer);
    assert_eq!(host.packet_names(viewer), vec!["player_info", "spawn", "head_rotation"]);
    match &packets[0] {
        Packet::PlayerInfo { action, display_name, uuid, .. } => {
            assert_eq!(*action, PlayerInfoAction::Add);
            assert_eq!(display_name, "Shopkeeper");
            assert_eq!(Some(*uuid), coordinator.entity(npc).unwrap().uuid());
        }
        other => panic!("expected player info, got {:?}", other),
    }

    host.clear();
    coordinator.despawn(npc).unwrap();
    assert_eq!(host.packet_names(viewer), vec!["despawn", "player_info"]);
    assert!(matches!(
        host.packets(viewer)[1],
        Packet::PlayerInfo {
            action: PlayerInfoAction::Remove,
            ..
        }
    ));
}

#[test]
fn test_move_before_spawn_is_rejected() {
    let (_host, mut coordinator) = setup();
    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    let id = coordinator.entity(zombie).unwrap().id();

    match coordinator.move_to(zombie, at(1.0)) {
        Err(ReplicationError::NotSpawned(missing)) => assert_eq!(missing, id),
        other => panic!("expected NotSpawned, got {:?}", other),
    }
}

#[test]
fn test_short_moves_are_relative_long_moves_teleport() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    coordinator.spawn(zombie).unwrap();
    host.clear();

    coordinator.move_to(zombie, at(4.0).with_rotation(90.0, 0.0)).unwrap();
    let packets = host.packets(viewer);
    assert!(matches!(packets[0], Packet::RelativeMove { dx, .. } if dx == 4.0));
    assert!(matches!(packets[1], Packet::HeadRotation { yaw, .. } if yaw == 90.0));

    host.clear();
    coordinator.move_to(zombie, at(20.0)).unwrap();
    assert!(matches!(host.packets(viewer)[0], Packet::Teleport { x, .. } if x == 20.0));
    assert_eq!(coordinator.entity(zombie).unwrap().transform().position.x, 20.0);
}

#[test]
fn test_move_out_of_range_despawns_after_movement() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 50.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    coordinator.spawn(zombie).unwrap();
    host.clear();

    coordinator.move_to(zombie, at(-20.0)).unwrap();
    assert_eq!(host.packet_names(viewer), vec!["teleport", "head_rotation", "despawn"]);
    assert!(!coordinator.entity(zombie).unwrap().is_viewed_by(viewer));
}

#[test]
fn test_move_into_range_spawns() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 100.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    coordinator.spawn(zombie).unwrap();
    assert!(host.packets(viewer).is_empty());

    coordinator.move_to(zombie, at(45.0)).unwrap();
    assert_eq!(host.count(viewer, "spawn"), 1);
}

#[test]
fn test_remove_invalidates_handle_and_releases_id() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    let id = coordinator.entity(zombie).unwrap().id();
    coordinator.spawn(zombie).unwrap();
    coordinator.remove(zombie).unwrap();

    assert_eq!(host.count(viewer, "despawn"), 1);
    assert!(matches!(coordinator.entity(zombie), Err(ReplicationError::StaleHandle)));
    assert!(matches!(coordinator.remove(zombie), Err(ReplicationError::StaleHandle)));
    assert_eq!(coordinator.handle_of(id), None);
    assert!(coordinator.is_empty());

    let skeleton = coordinator.create(EntityKind::Mob, "skeleton", at(0.0));
    assert_ne!(skeleton, zombie);
    assert!(coordinator.entity(zombie).is_err());
    assert_eq!(coordinator.entity(skeleton).unwrap().type_name(), "skeleton");
}

#[test]
fn test_ids_skip_native_entities() {
    let (host, mut coordinator) = setup();
    let floor = coordinator.config().entity_id_floor;
    host.add_native(NETHER, floor);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    let id = coordinator.entity(zombie).unwrap().id();
    assert_eq!(id, EntityId(floor + 1));
    assert_eq!(coordinator.handle_of(id), Some(zombie));
}

#[test]
fn test_entity_can_be_spawned_again_after_despawn() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    coordinator.spawn(zombie).unwrap();
    coordinator.despawn(zombie).unwrap();
    coordinator.spawn(zombie).unwrap();

    assert_eq!(host.packet_names(viewer), vec![
        "spawn",
        "head_rotation",
        "despawn",
        "spawn",
        "head_rotation"
    ]);
}

#[test]
fn test_one_shot_packets_go_to_viewers_only() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);
    let outsider = host.add_viewer(OVERWORLD, 500.0);

    let cow = coordinator.create(EntityKind::Animal, "cow", at(0.0));
    coordinator.spawn(cow).unwrap();
    host.clear();

    coordinator.play_status(cow, EntityStatus::BreedHeart).unwrap();
    coordinator.add_velocity(cow, Velocity::new(0.0, 0.5, 0.0)).unwrap();
    coordinator.set_head_rotation(cow, 45.0).unwrap();

    assert_eq!(host.packet_names(viewer), vec!["status", "velocity", "head_rotation"]);
    assert!(matches!(host.packets(viewer)[0], Packet::Status { status: 6, .. }));
    assert!(host.packets(outsider).is_empty());
    assert_eq!(coordinator.entity(cow).unwrap().head_yaw(), 45.0);
}

#[test]
fn test_sleep_and_wake_require_player_kind() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let npc = coordinator.create_player("Sleepy", at(0.0));
    coordinator.spawn(npc).unwrap();
    host.clear();

    let bed = BlockPos::new(0, 64, 0);
    coordinator.sleep(npc, bed).unwrap();
    coordinator.wake(npc).unwrap();
    assert_eq!(
        host.packets(viewer),
        vec![
            Packet::Bed {
                id: coordinator.entity(npc).unwrap().id(),
                position: Some(bed)
            },
            Packet::Bed {
                id: coordinator.entity(npc).unwrap().id(),
                position: None
            },
        ]
    );

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    assert!(matches!(
        coordinator.sleep(zombie, bed),
        Err(ReplicationError::CapabilityMissing { .. })
    ));
}

#[test]
fn test_sleeping_player_spawns_in_bed() {
    let (host, mut coordinator) = setup();
    let npc = coordinator.create_player("Sleepy", at(0.0));
    coordinator.spawn(npc).unwrap();
    coordinator.sleep(npc, BlockPos::new(1, 64, 1)).unwrap();

    let late = host.add_viewer(OVERWORLD, 0.0);
    coordinator.on_viewer_joined(late);
    assert_eq!(
        host.packet_names(late),
        vec!["team", "player_info", "spawn", "head_rotation", "bed"]
    );
}

#[test]
fn test_passengers_mount_and_dismount() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let horse = coordinator.create(EntityKind::Animal, "horse", at(0.0));
    let rider = coordinator.create(EntityKind::Mob, "skeleton", at(0.0));
    let rider_id = coordinator.entity(rider).unwrap().id();
    coordinator.spawn(horse).unwrap();
    coordinator.spawn(rider).unwrap();
    host.clear();

    coordinator.add_passenger(horse, rider_id).unwrap();
    coordinator.add_passenger(horse, rider_id).unwrap();
    assert_eq!(coordinator.entity(horse).unwrap().passengers(), &[rider_id]);

    assert!(coordinator.remove_passenger(horse, rider_id).unwrap());
    assert!(!coordinator.remove_passenger(horse, rider_id).unwrap());

    let mounts: Vec<Vec<EntityId>> = host
        .packets(viewer)
        .into_iter()
        .filter_map(|packet| match packet {
            Packet::Mount { passengers, .. } => Some(passengers),
            _ => None,
        })
        .collect();
    assert_eq!(mounts, vec![vec![rider_id], vec![rider_id], vec![]]);

    // Removing the rider leaves the horse alone: passengers are ids only.
    coordinator.set_passengers(horse, [rider_id]).unwrap();
    coordinator.remove(rider).unwrap();
    assert_eq!(coordinator.entity(horse).unwrap().passengers(), &[rider_id]);
}

#[test]
fn test_sitting_player_rides_seat_removed_with_it() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let npc = coordinator.create_player("Sitter", at(0.0));
    let npc_id = coordinator.entity(npc).unwrap().id();
    coordinator.spawn(npc).unwrap();
    coordinator.sit(npc).unwrap();
    coordinator.sit(npc).unwrap();
    assert_eq!(coordinator.len(), 2);

    let seat = coordinator
        .entity(npc)
        .unwrap()
        .player()
        .and_then(|profile| profile.seat)
        .expect("seat created");
    let stand = coordinator.entity(seat).unwrap();
    assert_eq!(stand.kind(), EntityKind::ArmorStand);
    assert!(stand.flags.invisible);
    assert_eq!(stand.passengers(), &[npc_id]);
    assert!(host
        .packets(viewer)
        .iter()
        .any(|packet| matches!(packet, Packet::Mount { passengers, .. } if passengers == &vec![npc_id])));

    coordinator.despawn(npc).unwrap();
    assert_eq!(coordinator.len(), 1);
    assert!(coordinator.entity(seat).is_err());
    assert_eq!(host.count(viewer, "despawn"), 2);
}

#[test]
fn test_sit_respawns_seat_despawned_directly() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let npc = coordinator.create_player("Sitter", at(0.0));
    coordinator.spawn(npc).unwrap();
    coordinator.sit(npc).unwrap();
    let seat = coordinator
        .entity(npc)
        .unwrap()
        .player()
        .and_then(|profile| profile.seat)
        .expect("seat created");

    coordinator.despawn(seat).unwrap();
    assert!(!coordinator.entity(seat).unwrap().is_viewed_by(viewer));

    coordinator.sit(npc).unwrap();
    assert_eq!(coordinator.len(), 2);
    assert!(coordinator.entity(seat).unwrap().is_spawned());
    assert!(coordinator.entity(seat).unwrap().is_viewed_by(viewer));
    assert_eq!(host.count(viewer, "spawn"), 3);
}

#[test]
fn test_stand_removes_seat_and_tameables_toggle_flag() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let npc = coordinator.create_player("Sitter", at(0.0));
    coordinator.spawn(npc).unwrap();
    coordinator.sit(npc).unwrap();
    coordinator.stand(npc).unwrap();
    assert_eq!(coordinator.len(), 1);
    assert!(coordinator.entity(npc).unwrap().player().unwrap().seat.is_none());

    let wolf = coordinator.create(EntityKind::Tameable, "wolf", at(0.0));
    coordinator.spawn(wolf).unwrap();
    host.clear();
    coordinator.sit(wolf).unwrap();
    match &host.packets(viewer)[0] {
        Packet::MetadataDelta { fields, .. } => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].value, MetadataValue::Byte(1));
        }
        other => panic!("expected metadata, got {:?}", other),
    }

    let zombie = coordinator.create(EntityKind::Mob, "zombie", at(0.0));
    assert!(matches!(
        coordinator.sit(zombie),
        Err(ReplicationError::CapabilityMissing { capability: "seat", .. })
    ));
}

#[test]
fn test_shutdown_despawns_everything() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    for x in 0..3 {
        let zombie = coordinator.create(EntityKind::Mob, "zombie", at(x as f64));
        coordinator.spawn(zombie).unwrap();
    }
    coordinator.shutdown();

    assert_eq!(host.count(viewer, "despawn"), 3);
    assert!(coordinator.handles().iter().all(|h| !coordinator.entity(*h).unwrap().is_spawned()));
}
