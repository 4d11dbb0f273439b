//! Deferred tab-list cleanup and the hidden-name-tag team.

use super::*;
use crate::protocol::{NameTagVisibility, PlayerInfoAction};

fn tab_removals(host: &MockHost, viewer: ViewerId) -> usize {
    host.packets(viewer)
        .iter()
        .filter(|packet| {
            matches!(
                packet,
                Packet::PlayerInfo {
                    action: PlayerInfoAction::Remove,
                    ..
                }
            )
        })
        .count()
}

#[test]
fn test_young_viewers_wait_for_tab_cleanup() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer_aged(OVERWORLD, 0.0, Duration::from_secs(1));

    let npc = coordinator.create_player("Guard", at(0.0));
    coordinator.spawn(npc).unwrap();
    assert_eq!(coordinator.pending_tab_removals(viewer), 1);

    run_ticks(&mut coordinator, 10);
    assert_eq!(tab_removals(&host, viewer), 0);
    assert_eq!(coordinator.pending_tab_removals(viewer), 1);

    host.set_age(viewer, Duration::from_secs(4));
    run_ticks(&mut coordinator, 9);
    assert_eq!(tab_removals(&host, viewer), 0);
    run_ticks(&mut coordinator, 1);
    assert_eq!(tab_removals(&host, viewer), 1);
    assert_eq!(coordinator.pending_tab_removals(viewer), 0);
    assert_eq!(coordinator.stats().tab_list_removals, 1);

    // Still rendered: only the tab entry went away.
    assert!(coordinator.entity(npc).unwrap().is_viewed_by(viewer));
    assert_eq!(host.count(viewer, "despawn"), 0);
}

#[test]
fn test_established_viewers_are_cleaned_on_first_sweep() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let npc = coordinator.create_player("Guard", at(0.0));
    coordinator.spawn(npc).unwrap();
    run_ticks(&mut coordinator, 10);

    assert_eq!(tab_removals(&host, viewer), 1);
    run_ticks(&mut coordinator, 20);
    assert_eq!(tab_removals(&host, viewer), 1);
}

#[test]
fn test_offline_and_quit_viewers_are_dropped() {
    let (host, mut coordinator) = setup();
    let gone = host.add_viewer_aged(OVERWORLD, 0.0, Duration::from_secs(1));
    let quitter = host.add_viewer_aged(OVERWORLD, 0.0, Duration::from_secs(1));

    let npc = coordinator.create_player("Guard", at(0.0));
    coordinator.spawn(npc).unwrap();
    assert_eq!(coordinator.pending_tab_removals(gone), 1);
    assert_eq!(coordinator.pending_tab_removals(quitter), 1);

    host.disconnect(gone);
    coordinator.on_viewer_quit(quitter);
    assert_eq!(coordinator.pending_tab_removals(quitter), 0);

    run_ticks(&mut coordinator, 10);
    assert_eq!(coordinator.pending_tab_removals(gone), 0);
    assert_eq!(tab_removals(&host, gone), 0);
}

#[test]
fn test_despawn_cancels_pending_tab_cleanup() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer_aged(OVERWORLD, 0.0, Duration::from_secs(1));

    let npc = coordinator.create_player("Guard", at(0.0));
    coordinator.spawn(npc).unwrap();
    coordinator.despawn(npc).unwrap();
    assert_eq!(coordinator.pending_tab_removals(viewer), 0);

    host.set_age(viewer, Duration::from_secs(10));
    run_ticks(&mut coordinator, 10);
    // Only the removal that accompanied the despawn.
    assert_eq!(tab_removals(&host, viewer), 1);
}

#[test]
fn test_join_registers_hidden_name_team() {
    let (host, mut coordinator) = setup();

    let hidden = coordinator.create_player("Hidden", at(0.0));
    coordinator.entity_mut(hidden).unwrap().player_mut().unwrap().hide_name_tag = true;
    coordinator.create_player("Shown", at(0.0));

    let viewer = host.add_viewer(OVERWORLD, 0.0);
    coordinator.on_viewer_joined(viewer);

    match &host.packets(viewer)[0] {
        Packet::TeamRegistration {
            team,
            name_tag_visibility,
            members,
        } => {
            assert_eq!(team, "phantom-hidden");
            assert_eq!(*name_tag_visibility, NameTagVisibility::Never);
            assert_eq!(members, &vec!["Hidden".to_string()]);
        }
        other => panic!("expected team registration, got {:?}", other),
    }
}

#[test]
fn test_spawning_hidden_player_joins_team_of_online_viewers() {
    let (host, mut coordinator) = setup();
    let near = host.add_viewer(OVERWORLD, 0.0);
    let far = host.add_viewer(OVERWORLD, 500.0);
    coordinator.on_viewer_joined(near);
    coordinator.on_viewer_joined(far);
    host.clear();

    let hidden = coordinator.create_player("Late", at(0.0));
    coordinator.entity_mut(hidden).unwrap().player_mut().unwrap().hide_name_tag = true;
    coordinator.spawn(hidden).unwrap();

    let expected = Packet::TeamMembers {
        team: "phantom-hidden".to_string(),
        members: vec!["Late".to_string()],
    };
    assert_eq!(
        host.packet_names(near),
        vec!["team_members", "player_info", "spawn", "head_rotation"]
    );
    assert_eq!(host.packets(near)[0], expected);
    assert_eq!(host.packets(far), vec![expected]);

    host.clear();
    let shown = coordinator.create_player("Shown", at(0.0));
    coordinator.spawn(shown).unwrap();
    assert_eq!(host.count(near, "team_members"), 0);
    assert!(host.packets(far).is_empty());
}

#[test]
fn test_resynced_player_is_queued_for_cleanup_again() {
    let (host, mut coordinator) = setup();
    let viewer = host.add_viewer(OVERWORLD, 0.0);

    let npc = coordinator.create_player("Guard", at(0.0));
    coordinator.spawn(npc).unwrap();
    run_ticks(&mut coordinator, 10);
    assert_eq!(tab_removals(&host, viewer), 1);

    host.fail_sends_to(viewer, true);
    coordinator.set_head_rotation(npc, 90.0).unwrap();
    host.fail_sends_to(viewer, false);
    coordinator.update(npc).unwrap();
    assert_eq!(host.count(viewer, "player_info"), 3);
    assert_eq!(coordinator.pending_tab_removals(viewer), 1);

    run_ticks(&mut coordinator, 10);
    assert_eq!(tab_removals(&host, viewer), 2);
}
