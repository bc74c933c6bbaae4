//! End-to-end coordinator scenarios.
//!
//! These drive `apply_command` directly, the way an in-process replicated
//! log would, rather than going through any transport.

use hyperbase_types::{DataType, ResultCode, ServerId};

use crate::command::{Command, SpaceBuilder};
use crate::kernel::apply_command;
use crate::state::State;

fn register_and_online(mut state: State, id: u64, addr: &str) -> State {
    let (s, out) = apply_command(state, Command::ServerRegister { id: ServerId::new(id), bind_to: addr.into() });
    assert_eq!(out.code, ResultCode::Success);
    state = s;
    let (s, out) = apply_command(state, Command::ServerOnline { id: ServerId::new(id), bind_to: None });
    assert_eq!(out.code, ResultCode::Success);
    s
}

#[test]
fn bootstrap_then_space_add_converges_to_a_full_chain() {
    let mut state = State::new();
    (state, _) = apply_command(state, Command::Init { cluster_token: 42 });
    let before_servers = state.version;
    state = register_and_online(state, 1, "a:1");
    state = register_and_online(state, 2, "b:1");
    state = register_and_online(state, 3, "c:1");
    assert!(state.version > before_servers);

    let space = SpaceBuilder::new("kv")
        .attribute("k", DataType::String)
        .unwrap()
        .attribute("v", DataType::String)
        .unwrap()
        .fault_tolerance(3)
        .unwrap()
        .build()
        .unwrap();
    let before_space = state.version;
    let (state, outcome) = apply_command(state, Command::SpaceAdd { space });
    assert_eq!(outcome.code, ResultCode::Success);
    assert!(state.version > before_space);

    assert_eq!(state.spaces.len(), 1);
    let kv = &state.spaces[0];
    assert_eq!(kv.subspaces.len(), 1);
    let region = &kv.subspaces[0].regions[0];
    let mut servers: Vec<u64> = region.replicas.iter().map(|r| r.server.get()).collect();
    servers.sort_unstable();
    assert_eq!(servers, vec![1, 2, 3]);
}

#[test]
fn adding_a_duplicate_space_name_fails_without_mutating_state() {
    let mut state = State::new();
    (state, _) = apply_command(state, Command::Init { cluster_token: 1 });
    state = register_and_online(state, 1, "a:1");
    let make_space = || SpaceBuilder::new("kv").attribute("k", DataType::String).unwrap().fault_tolerance(1).unwrap().build().unwrap();
    (state, _) = apply_command(state, Command::SpaceAdd { space: make_space() });
    let before = state.clone();
    let (state, outcome) = apply_command(state, Command::SpaceAdd { space: make_space() });
    assert_eq!(outcome.code, ResultCode::Duplicate);
    assert_eq!(state, before);
}

#[test]
fn server_shutdown_of_point_leader_drives_a_transfer() {
    let mut state = State::new();
    (state, _) = apply_command(state, Command::Init { cluster_token: 1 });
    state = register_and_online(state, 1, "a:1");
    state = register_and_online(state, 2, "b:1");
    state = register_and_online(state, 3, "c:1");
    let space = SpaceBuilder::new("kv").attribute("k", DataType::String).unwrap().fault_tolerance(2).unwrap().build().unwrap();
    (state, _) = apply_command(state, Command::SpaceAdd { space });

    let region_before = state.spaces[0].subspaces[0].regions[0].clone();
    let leader = region_before.point_leader().unwrap().server;

    (state, _) = apply_command(state, Command::ServerShutdown { id: leader });

    let region_after = &state.spaces[0].subspaces[0].regions[0];
    assert!(!region_after.replicas.iter().any(|r| r.server == leader));
    assert!(!state.transfers.is_empty(), "losing a replica while a third server is idle should enqueue a transfer");
}

#[test]
fn space_rm_clears_its_regions_transfers_and_intents() {
    let mut state = State::new();
    (state, _) = apply_command(state, Command::Init { cluster_token: 1 });
    state = register_and_online(state, 1, "a:1");
    state = register_and_online(state, 2, "b:1");
    let space = SpaceBuilder::new("kv").attribute("k", DataType::String).unwrap().fault_tolerance(2).unwrap().build().unwrap();
    (state, _) = apply_command(state, Command::SpaceAdd { space });
    let region_id = state.spaces[0].subspaces[0].regions[0].id;
    assert!(state.intents.contains_key(&region_id));

    let (state, outcome) = apply_command(state, Command::SpaceRm { name: "kv".into() });
    assert_eq!(outcome.code, ResultCode::Success);
    assert!(state.spaces.is_empty());
    assert!(!state.intents.contains_key(&region_id));
    assert!(state.transfers.iter().all(|t| t.region_id != region_id));
}

#[test]
fn read_only_toggle_only_bumps_version_on_change() {
    let mut state = State::new();
    (state, _) = apply_command(state, Command::Init { cluster_token: 1 });
    state = register_and_online(state, 1, "a:1");
    let before = state.version;
    (state, _) = apply_command(state, Command::ReadOnly(true));
    assert!(state.version > before);
    assert!(state.flags.contains(hyperbase_types::ConfigFlags::READ_ONLY));

    let settled = state.version;
    let (state, _) = apply_command(state, Command::ReadOnly(true));
    assert_eq!(state.version, settled, "re-asserting the same flag value is a no-op");
}

#[test]
fn config_ack_broadcasts_once_membership_catches_up() {
    let mut state = State::new();
    (state, _) = apply_command(state, Command::Init { cluster_token: 1 });
    state = register_and_online(state, 1, "a:1");
    let version = state.version;
    let (state, outcome) = apply_command(state, Command::ConfigAck { server: ServerId::new(1), version });
    assert_eq!(outcome.code, ResultCode::Success);
    assert_eq!(state.ack_barrier.complete_through(), version);
    assert_eq!(outcome.effects.len(), 1);
}
