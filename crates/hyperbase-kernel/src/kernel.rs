//! The coordinator's pure functional core.
//!
//! `apply_command` is the single entry point: it takes ownership of a
//! [`State`] and a [`Command`] and returns the new state plus an outcome.
//! There is no partial-effect path -- either the whole command lands or the
//! state comes back untouched with a failure code.

use std::collections::BTreeMap;

use hyperbase_types::{
    ConfigFlags, Region, RegionIntent, Replica, ResultCode, Server, ServerId, ServerState, Space, Subspace,
    SubspaceId, Transfer, TransferId, VirtualServerId,
};

use crate::command::{Command, NewSpace};
use crate::effects::{AckKind, Effect};
use crate::placement::compute_replica_sets;
use crate::state::State;

/// The result of applying one command: a code plus any broadcasts the shell
/// must publish. Every command yields a
/// small result code and nothing else escapes the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub code: ResultCode,
    pub effects: Vec<Effect>,
}

/// Applies `cmd` to `state`, returning the new state and its outcome. A
/// `MALFORMED`/`NOT_FOUND`/`NO_CAN_DO`/`DUPLICATE` result always leaves
/// `state` exactly as it was handed in.
#[must_use]
pub fn apply_command(mut state: State, cmd: Command) -> (State, CommandOutcome) {
    let mut effects = Vec::new();
    let code = match cmd {
        Command::Init { cluster_token } => cmd_init(&mut state, cluster_token),
        Command::ReadOnly(enabled) => cmd_read_only(&mut state, enabled, &mut effects),
        Command::FaultTolerance { space, replication_factor } => {
            cmd_fault_tolerance(&mut state, &space, replication_factor, &mut effects)
        }
        Command::ConfigGet => ResultCode::Success,
        Command::ConfigAck { server, version } => {
            cmd_ack(&mut state.ack_barrier, AckKind::Ack, server, version, &mut effects)
        }
        Command::ConfigStable { server, version } => {
            cmd_ack(&mut state.stable_barrier, AckKind::Stable, server, version, &mut effects)
        }
        Command::ServerRegister { id, bind_to } => cmd_server_register(&mut state, id, bind_to),
        Command::ServerOnline { id, bind_to } => cmd_server_online(&mut state, id, bind_to, &mut effects),
        Command::ServerOffline { id } => {
            cmd_server_transition(&mut state, id, ServerState::NotAvailable, &mut effects)
        }
        Command::ServerShutdown { id } => cmd_server_transition(&mut state, id, ServerState::Shutdown, &mut effects),
        Command::ServerKill { id } => cmd_server_kill(&mut state, id, &mut effects),
        Command::ServerForget { id } => cmd_server_forget(&mut state, id, &mut effects),
        Command::ServerSuspect { id, version: _ } => {
            cmd_server_transition(&mut state, id, ServerState::NotAvailable, &mut effects)
        }
        // The reason string is advisory only -- ignored.
        Command::ReportDisconnect { server, version: _, reason: _ } => {
            cmd_server_transition(&mut state, server, ServerState::NotAvailable, &mut effects)
        }
        Command::SpaceAdd { space } => cmd_space_add(&mut state, space, &mut effects),
        Command::SpaceRm { name } => cmd_space_rm(&mut state, &name, &mut effects),
        Command::SpaceMv { from, to } => cmd_space_mv(&mut state, &from, &to),
        Command::IndexAdd { space, attr } => cmd_index_add(&mut state, &space, attr),
        Command::IndexRm { space, index } => cmd_index_rm(&mut state, &space, index),
        Command::TransferGoLive { version: _, transfer } => cmd_transfer_go_live(&mut state, transfer),
        Command::TransferComplete { version: _, transfer } => cmd_transfer_complete(&mut state, transfer),
        Command::CheckpointStable { server, configuration_version, checkpoint_number } => {
            cmd_checkpoint_stable(&mut state, server, configuration_version, checkpoint_number, &mut effects)
        }
        Command::Periodic | Command::Alarm => cmd_checkpoint(&mut state, &mut effects),
        Command::Checkpoint => cmd_checkpoint(&mut state, &mut effects),
        Command::Checkpoints => ResultCode::Success,
        Command::DebugDump => ResultCode::Success,
    };
    (state, CommandOutcome { code, effects })
}

fn cmd_init(state: &mut State, cluster_token: u64) -> ResultCode {
    if state.is_initialized() {
        // idempotent from the client's viewpoint; the cluster id is never overwritten
        return ResultCode::Success;
    }
    state.cluster = cluster_token;
    state.version = 1;
    // Open the barriers at version 1 with no membership yet (no servers have
    // registered), so later versions can cascade-close instead of stalling
    // on a permanent gap at the genesis version.
    let empty = std::collections::BTreeSet::new();
    state.ack_barrier.open(1, empty.clone());
    state.stable_barrier.open(1, empty);
    ResultCode::Success
}

fn cmd_read_only(state: &mut State, enabled: bool, effects: &mut Vec<Effect>) -> ResultCode {
    if !state.is_initialized() {
        return ResultCode::Uninitialized;
    }
    let changed = enabled != state.flags.contains(ConfigFlags::READ_ONLY);
    if changed {
        state.flags = if enabled { state.flags.with(ConfigFlags::READ_ONLY) } else { state.flags.without(ConfigFlags::READ_ONLY) };
        close_topology_change(state, effects);
    }
    ResultCode::Success
}

fn cmd_fault_tolerance(state: &mut State, space_name: &str, replication_factor: u32, effects: &mut Vec<Effect>) -> ResultCode {
    let Some(idx) = state.space_index(space_name) else {
        return ResultCode::UnknownSpace;
    };
    // The explicit command recomputes with width R+1, distinct from the
    // literal width a `SpaceAdd` caller supplies up front.
    state.spaces[idx].fault_tolerance = replication_factor + 1;
    close_topology_change(state, effects);
    ResultCode::Success
}

fn cmd_ack(
    barrier: &mut crate::barrier::Barrier,
    kind: AckKind,
    server: ServerId,
    version: u64,
    effects: &mut Vec<Effect>,
) -> ResultCode {
    for closed in barrier.ack(server, version) {
        effects.push(Effect::BroadcastAck { kind, version: closed });
    }
    ResultCode::Success
}

fn cmd_server_register(state: &mut State, id: ServerId, bind_to: String) -> ResultCode {
    if state.server(id).is_some() {
        return ResultCode::Duplicate;
    }
    state.servers.push(Server { id, bind_to, state: ServerState::Assigned });
    ResultCode::Success
}

fn cmd_server_online(state: &mut State, id: ServerId, bind_to: Option<String>, effects: &mut Vec<Effect>) -> ResultCode {
    let Some(server_idx) = state.servers.iter().position(|s| s.id == id) else {
        return ResultCode::NotFound;
    };
    if let Some(new_addr) = &bind_to {
        if state.servers.iter().any(|s| s.id != id && &s.bind_to == new_addr) {
            return ResultCode::Duplicate;
        }
    }
    if matches!(state.servers[server_idx].state, ServerState::Killed) {
        return ResultCode::NoCanDo;
    }
    if let Some(addr) = bind_to {
        state.servers[server_idx].bind_to = addr;
    }
    state.servers[server_idx].state = ServerState::Available;
    close_topology_change(state, effects);
    ResultCode::Success
}

fn cmd_server_transition(state: &mut State, id: ServerId, target: ServerState, effects: &mut Vec<Effect>) -> ResultCode {
    let Some(server) = state.server_mut(id) else {
        return ResultCode::NotFound;
    };
    if matches!(server.state, ServerState::Killed) {
        return ResultCode::NoCanDo;
    }
    server.state = target;
    close_topology_change(state, effects);
    ResultCode::Success
}

fn cmd_server_kill(state: &mut State, id: ServerId, effects: &mut Vec<Effect>) -> ResultCode {
    let Some(server) = state.server_mut(id) else {
        return ResultCode::NotFound;
    };
    server.state = ServerState::Killed;
    close_topology_change(state, effects);
    ResultCode::Success
}

fn cmd_server_forget(state: &mut State, id: ServerId, effects: &mut Vec<Effect>) -> ResultCode {
    let Some(idx) = state.servers.iter().position(|s| s.id == id) else {
        return ResultCode::NotFound;
    };
    state.servers.remove(idx);
    close_topology_change(state, effects);
    ResultCode::Success
}

fn cmd_space_add(state: &mut State, new_space: NewSpace, effects: &mut Vec<Effect>) -> ResultCode {
    if !state.is_initialized() {
        return ResultCode::Uninitialized;
    }
    if state.space_index(&new_space.name).is_some() {
        return ResultCode::Duplicate;
    }
    let attributes = new_space
        .attributes
        .iter()
        .map(|a| hyperbase_types::Attribute::new(a.name.clone(), a.datatype))
        .collect();
    let Ok(schema) = hyperbase_types::Schema::new(attributes, new_space.authorization) else {
        return ResultCode::Malformed;
    };
    let subspaces = new_space
        .subspaces
        .iter()
        .map(|ss| Subspace { id: SubspaceId::new(state.counter.next()), attrs: ss.attrs.clone(), regions: Vec::new() })
        .collect();
    let space = Space {
        id: hyperbase_types::SpaceId::new(state.counter.next()),
        name: new_space.name,
        schema,
        fault_tolerance: new_space.fault_tolerance,
        predecessor_width: new_space.predecessor_width,
        subspaces,
        indices: Vec::new(),
    };
    state.spaces.push(space);
    close_topology_change(state, effects);
    ResultCode::Success
}

fn cmd_space_rm(state: &mut State, name: &str, effects: &mut Vec<Effect>) -> ResultCode {
    let Some(idx) = state.space_index(name) else {
        return ResultCode::NotFound;
    };
    let space = state.spaces.remove(idx);
    let region_ids: Vec<_> = space.subspaces.iter().flat_map(|ss| ss.regions.iter().map(|r| r.id)).collect();
    state.transfers.retain(|t| !region_ids.contains(&t.region_id));
    for rid in &region_ids {
        state.intents.remove(rid);
        state.offline.remove(rid);
    }
    close_topology_change(state, effects);
    ResultCode::Success
}

fn cmd_space_mv(state: &mut State, from: &str, to: &str) -> ResultCode {
    if state.space_index(to).is_some() {
        return ResultCode::Duplicate;
    }
    let Some(idx) = state.space_index(from) else {
        return ResultCode::NotFound;
    };
    state.spaces[idx].name = to.to_string();
    ResultCode::Success
}

fn cmd_index_add(state: &mut State, space_name: &str, attr: usize) -> ResultCode {
    let Some(idx) = state.space_index(space_name) else {
        return ResultCode::UnknownSpace;
    };
    if attr == 0 || attr >= state.spaces[idx].schema.attributes.len() {
        return ResultCode::UnknownAttr;
    }
    let index_id = hyperbase_types::IndexId::new(state.counter.next());
    state.spaces[idx].indices.push(index_id);
    ResultCode::Success
}

fn cmd_index_rm(state: &mut State, space_name: &str, index: hyperbase_types::IndexId) -> ResultCode {
    let Some(idx) = state.space_index(space_name) else {
        return ResultCode::UnknownSpace;
    };
    let Some(pos) = state.spaces[idx].indices.iter().position(|&i| i == index) else {
        return ResultCode::NotFound;
    };
    state.spaces[idx].indices.remove(pos);
    ResultCode::Success
}

fn cmd_transfer_go_live(state: &mut State, transfer_id: TransferId) -> ResultCode {
    let Some(transfer) = state.transfers.iter().find(|t| t.id == transfer_id).copied() else {
        return ResultCode::NotFound;
    };
    let Some(region) = find_region_mut(state, transfer.region_id) else {
        return ResultCode::NotFound;
    };
    if region.tail().map(|t| t.server) == Some(transfer.dst_server) {
        // already live
        return ResultCode::Success;
    }
    region.replicas.push(Replica { server: transfer.dst_server, virt: transfer.dst_virtual });
    ResultCode::Success
}

fn cmd_transfer_complete(state: &mut State, transfer_id: TransferId) -> ResultCode {
    let Some(pos) = state.transfers.iter().position(|t| t.id == transfer_id) else {
        return ResultCode::NotFound;
    };
    let transfer = state.transfers[pos];
    let Some(region) = find_region_mut(state, transfer.region_id) else {
        return ResultCode::NotFound;
    };
    let chain_len = region.replicas.len();
    let is_live = chain_len >= 2
        && region.replicas[chain_len - 2].server == transfer.src_server
        && region.replicas[chain_len - 1].server == transfer.dst_server;
    if !is_live {
        return ResultCode::NoCanDo;
    }
    region.replicas.retain(|r| r.server != transfer.src_server || r.virt != transfer.src_virtual);
    state.transfers.remove(pos);
    ResultCode::Success
}

fn cmd_checkpoint_stable(
    state: &mut State,
    server: ServerId,
    configuration_version: u64,
    checkpoint_number: u64,
    effects: &mut Vec<Effect>,
) -> ResultCode {
    if configuration_version < state.version {
        return ResultCode::Success;
    }
    for closed in state.checkps_barrier.ack(server, checkpoint_number) {
        effects.push(Effect::BroadcastAck { kind: AckKind::Checkps, version: closed });
    }
    if checkpoint_number > state.stable_checkpoint {
        state.stable_checkpoint = checkpoint_number;
    }
    ResultCode::Success
}

fn cmd_checkpoint(state: &mut State, effects: &mut Vec<Effect>) -> ResultCode {
    state.checkpoint += 1;
    let members: std::collections::BTreeSet<ServerId> = state.available_servers().into_iter().collect();
    state.checkp_barrier.open(state.checkpoint, members);
    effects.push(Effect::BroadcastCheckpoint { checkpoint: state.checkpoint });
    ResultCode::Success
}

fn find_region_mut(state: &mut State, region_id: hyperbase_types::RegionId) -> Option<&mut Region> {
    state
        .spaces
        .iter_mut()
        .flat_map(|s| s.subspaces.iter_mut())
        .flat_map(|ss| ss.regions.iter_mut())
        .find(|r| r.id == region_id)
}

/// The closing sequence every topology-changing command shares:
/// rebalance every space, emit a new configuration version, broadcast it.
fn close_topology_change(state: &mut State, effects: &mut Vec<Effect>) {
    rebalance(state);
    let version = state.advance_configuration();
    effects.push(Effect::BroadcastConfig { version });
}

fn rebalance(state: &mut State) {
    state.repermute_if_needed();
    let permutation = state.permutation.clone();
    let checkpoint = state.checkpoint;
    for space_idx in 0..state.spaces.len() {
        rebalance_space(state, space_idx, &permutation, checkpoint);
    }
}

fn rebalance_space(state: &mut State, space_idx: usize, permutation: &[ServerId], checkpoint: u64) {
    let fault_tolerance = state.spaces[space_idx].fault_tolerance;
    let predecessor_width = state.spaces[space_idx].predecessor_width;
    for ss_idx in 0..state.spaces[space_idx].subspaces.len() {
        if state.spaces[space_idx].subspaces[ss_idx].regions.is_empty() {
            init_region(state, space_idx, ss_idx, permutation, fault_tolerance, predecessor_width);
        }
        recompute_intents(state, space_idx, ss_idx, permutation, fault_tolerance, predecessor_width);
        converge_subspace(state, space_idx, ss_idx, checkpoint);
    }
}

/// Re-derives each region's desired replica chain from the current
/// permutation. Only replaces a region's intent when the desired *server*
/// set actually changed -- an unrelated rebalance pass must not reset the
/// checkpoint baseline that gates step 6's reordering.
fn recompute_intents(
    state: &mut State,
    space_idx: usize,
    ss_idx: usize,
    permutation: &[ServerId],
    fault_tolerance: u32,
    predecessor_width: u32,
) {
    let region_ids: Vec<_> = state.spaces[space_idx].subspaces[ss_idx].regions.iter().map(|r| r.id).collect();
    if region_ids.is_empty() || permutation.is_empty() {
        return;
    }
    let chains = compute_replica_sets(permutation, region_ids.len(), fault_tolerance, predecessor_width);
    for (region_id, chain) in region_ids.into_iter().zip(chains) {
        if chain.len() as u32 != fault_tolerance {
            continue; // not enough available servers yet to fully re-plan this region
        }
        let desired: Vec<Replica> =
            chain.iter().map(|&server| Replica { server, virt: VirtualServerId::NONE }).collect();
        let unchanged = state
            .intents
            .get(&region_id)
            .is_some_and(|intent| intent.desired_replicas.iter().map(|r| r.server).eq(desired.iter().map(|r| r.server)));
        if !unchanged {
            state.intents.insert(region_id, RegionIntent { region_id, desired_replicas: desired, checkpoint: state.checkpoint });
        }
    }
}

fn init_region(
    state: &mut State,
    space_idx: usize,
    ss_idx: usize,
    permutation: &[ServerId],
    fault_tolerance: u32,
    predecessor_width: u32,
) {
    if permutation.is_empty() {
        return;
    }
    let dims = state.spaces[space_idx].subspaces[ss_idx].attrs.len();
    let chains = compute_replica_sets(permutation, 1, fault_tolerance, predecessor_width);
    let chain = &chains[0];
    if chain.is_empty() {
        return;
    }
    let replicas: Vec<Replica> =
        chain.iter().map(|&server| Replica { server, virt: VirtualServerId::new(state.counter.next()) }).collect();
    let region_id = hyperbase_types::RegionId::new(state.counter.next());
    let region = Region {
        id: region_id,
        lower_coord: vec![0; dims],
        upper_coord: vec![u64::MAX; dims],
        replicas: replicas.clone(),
    };
    state.intents.insert(region_id, RegionIntent { region_id, desired_replicas: replicas, checkpoint: state.checkpoint });
    state.spaces[space_idx].subspaces[ss_idx].regions.push(region);
}

fn converge_subspace(state: &mut State, space_idx: usize, ss_idx: usize, checkpoint: u64) {
    let region_ids: Vec<_> = state.spaces[space_idx].subspaces[ss_idx].regions.iter().map(|r| r.id).collect();
    for region_id in region_ids {
        if state.transfers.iter().any(|t| t.region_id == region_id) {
            continue; // step 1: a live transfer already drives this region
        }
        let Some(intent) = state.intents.get(&region_id).cloned() else { continue };
        let servers = state.servers.clone();
        let mut counter = state.counter;
        let mut offline_entry = state.offline.get(&region_id).copied();
        let region = state
            .spaces
            .iter_mut()
            .flat_map(|s| s.subspaces.iter_mut())
            .flat_map(|ss| ss.regions.iter_mut())
            .find(|r| r.id == region_id)
            .expect("region_id collected from this same state");
        let transfer = converge_region(region, &intent, &servers, checkpoint, &mut offline_entry, &mut counter);
        state.counter = counter;
        match offline_entry {
            Some(rep) => {
                state.offline.insert(region_id, rep);
            }
            None => {
                state.offline.remove(&region_id);
            }
        }
        if let Some(transfer) = transfer {
            state.transfers.push(transfer);
        }
    }
}

/// Runs the six-step convergence rule for one region, returning a
/// new transfer when one is needed (at most one per pass, per region).
fn converge_region(
    region: &mut Region,
    intent: &RegionIntent,
    servers: &[Server],
    checkpoint: u64,
    offline: &mut Option<Replica>,
    counter: &mut hyperbase_types::IdCounter,
) -> Option<Transfer> {
    // Step 2: drop replicas whose server is no longer AVAILABLE.
    let mut dropped_shutdown = None;
    let mut kept = Vec::with_capacity(region.replicas.len());
    for rep in &region.replicas {
        match servers.iter().find(|s| s.id == rep.server).map(|s| s.state) {
            Some(ServerState::Available) => kept.push(*rep),
            Some(ServerState::Shutdown) => dropped_shutdown = Some(*rep),
            _ => {}
        }
    }
    region.replicas = kept;
    if region.replicas.is_empty() {
        if let Some(rep) = dropped_shutdown {
            *offline = Some(rep);
        }
    }

    // Step 3: trim replicas the intent no longer wants, never below one.
    let desired_servers: Vec<ServerId> = intent.desired_replicas.iter().map(|r| r.server).collect();
    let mut i = 0;
    while region.replicas.len() > 1 && i < region.replicas.len() {
        if desired_servers.contains(&region.replicas[i].server) {
            i += 1;
        } else {
            region.replicas.remove(i);
        }
    }

    // Step 4: restore from the offline record once its server is available again.
    if region.replicas.is_empty() {
        if let Some(rep) = *offline {
            if servers.iter().any(|s| s.id == rep.server && s.is_available()) {
                region.replicas.push(Replica { server: rep.server, virt: VirtualServerId::new(counter.next()) });
                *offline = None;
            }
        }
    }

    // Step 5: start a transfer toward the first missing intended replica.
    let current_servers: Vec<ServerId> = region.replicas.iter().map(|r| r.server).collect();
    for desired in &intent.desired_replicas {
        if current_servers.contains(&desired.server) {
            continue;
        }
        if let Some(tail) = region.tail() {
            return Some(Transfer {
                id: TransferId::new(counter.next()),
                region_id: region.id,
                src_server: tail.server,
                src_virtual: tail.virt,
                dst_server: desired.server,
                dst_virtual: VirtualServerId::new(counter.next()),
            });
        }
        region.replicas.push(Replica { server: desired.server, virt: VirtualServerId::new(counter.next()) });
        return None;
    }

    // Step 6: once the checkpoint has advanced past the intent's, roll the
    // earliest out-of-order replica to the tail via a fresh-virtual-id
    // transfer on the same physical server.
    if checkpoint > intent.checkpoint {
        for (idx, rep) in region.replicas.iter().enumerate() {
            let desired_idx = intent.desired_replicas.iter().position(|d| d.server == rep.server);
            if desired_idx != Some(idx) {
                if let Some(tail) = region.tail() {
                    if tail.server != rep.server {
                        return Some(Transfer {
                            id: TransferId::new(counter.next()),
                            region_id: region.id,
                            src_server: rep.server,
                            src_virtual: rep.virt,
                            dst_server: rep.server,
                            dst_virtual: VirtualServerId::new(counter.next()),
                        });
                    }
                }
                break;
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use hyperbase_types::{DataType, ServerId};

    use super::*;
    use crate::command::SpaceBuilder;

    fn online(mut state: State, id: u64, addr: &str) -> State {
        let (s, out) = apply_command(state, Command::ServerRegister { id: ServerId::new(id), bind_to: addr.into() });
        assert_eq!(out.code, ResultCode::Success);
        state = s;
        let (s, out) = apply_command(state, Command::ServerOnline { id: ServerId::new(id), bind_to: None });
        assert_eq!(out.code, ResultCode::Success);
        s
    }

    #[test]
    fn bootstrap_and_space_add_places_full_chain() {
        let mut state = State::new();
        (state, _) = apply_command(state, Command::Init { cluster_token: 42 });
        state = online(state, 1, "a:1");
        state = online(state, 2, "b:1");
        state = online(state, 3, "c:1");

        let space = SpaceBuilder::new("kv")
            .attribute("k", DataType::String)
            .unwrap()
            .attribute("v", DataType::String)
            .unwrap()
            .fault_tolerance(3)
            .unwrap()
            .build()
            .unwrap();
        let (state, outcome) = apply_command(state, Command::SpaceAdd { space });
        assert_eq!(outcome.code, ResultCode::Success);

        let kv = state.spaces.iter().find(|s| s.name == "kv").unwrap();
        let region = &kv.subspaces[0].regions[0];
        assert_eq!(region.replicas.len(), 3);
        let mut servers: Vec<_> = region.replicas.iter().map(|r| r.server.get()).collect();
        servers.sort_unstable();
        assert_eq!(servers, vec![1, 2, 3]);
    }

    #[test]
    fn double_init_is_idempotent() {
        let state = State::new();
        let (state, out1) = apply_command(state, Command::Init { cluster_token: 42 });
        assert_eq!(out1.code, ResultCode::Success);
        let (state, out2) = apply_command(state, Command::Init { cluster_token: 99 });
        assert_eq!(out2.code, ResultCode::Success);
        assert_eq!(state.cluster, 42);
    }

    #[test]
    fn register_duplicate_id_fails() {
        let state = State::new();
        let (state, _) = apply_command(state, Command::ServerRegister { id: ServerId::new(1), bind_to: "a:1".into() });
        let (_, out) = apply_command(state, Command::ServerRegister { id: ServerId::new(1), bind_to: "b:1".into() });
        assert_eq!(out.code, ResultCode::Duplicate);
    }

    #[test]
    fn shutdown_of_killed_server_is_refused() {
        let state = State::new();
        let (state, _) = apply_command(state, Command::ServerRegister { id: ServerId::new(1), bind_to: "a:1".into() });
        let (state, _) = apply_command(state, Command::ServerKill { id: ServerId::new(1) });
        let (_, out) = apply_command(state, Command::ServerShutdown { id: ServerId::new(1) });
        assert_eq!(out.code, ResultCode::NoCanDo);
    }

    #[test]
    fn config_version_strictly_increases() {
        let mut state = State::new();
        (state, _) = apply_command(state, Command::Init { cluster_token: 1 });
        let before = state.version;
        state = online(state, 1, "a:1");
        assert!(state.version > before);
    }

    #[test]
    fn transfer_lifecycle_go_live_then_complete() {
        let mut state = State::new();
        (state, _) = apply_command(state, Command::Init { cluster_token: 1 });
        state = online(state, 1, "a:1");
        state = online(state, 2, "b:1");
        let space = SpaceBuilder::new("kv")
            .attribute("k", DataType::String)
            .unwrap()
            .fault_tolerance(1)
            .unwrap()
            .build()
            .unwrap();
        (state, _) = apply_command(state, Command::SpaceAdd { space });
        state = online(state, 3, "c:1");
        (state, _) = apply_command(state, Command::FaultTolerance { space: "kv".into(), replication_factor: 2 });

        let transfer = state.transfers.first().copied().expect("a transfer was enqueued toward width 3");
        let (state, out) = apply_command(state, Command::TransferGoLive { version: state.version, transfer: transfer.id });
        assert_eq!(out.code, ResultCode::Success);
        let region = state.spaces[0].subspaces[0].regions.iter().find(|r| r.id == transfer.region_id).unwrap();
        assert_eq!(region.tail().unwrap().server, transfer.dst_server);

        let (state, out) = apply_command(state, Command::TransferComplete { version: state.version, transfer: transfer.id });
        assert_eq!(out.code, ResultCode::Success);
        assert!(state.transfers.is_empty());
    }
}
