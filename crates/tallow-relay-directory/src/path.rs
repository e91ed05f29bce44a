//! Circuit-path selection: picking an entry, middle(s), and exit relay
//! out of the directory's known-online population.

use rand::Rng;
use thiserror::Error;

use crate::model::{RelayEntry, RelayMode};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum PathError {
    #[error("no entry relay available")]
    NoEntryRelay,
    #[error("no exit relay available")]
    NoExitRelay,
    #[error("not enough middle relays for the requested hop count")]
    InsufficientMiddles,
}

/// Choose `hop_count` relays (entry, then `hop_count - 2` middles, then
/// exit) from `relays`. `relays` is assumed to already be filtered to
/// online-only candidates by the caller.
///
/// Ties in trust score are broken uniformly at random among the tied
/// candidates, rather than by insertion order, so that path selection
/// isn't predictable from directory listing order.
pub fn select_relays_for_circuit(
    relays: &[RelayEntry],
    hop_count: usize,
    prefer_entry_id: Option<&str>,
    prefer_exit_id: Option<&str>,
    rng: &mut impl Rng,
) -> Result<Vec<RelayEntry>, PathError> {
    if hop_count < 2 {
        return Err(PathError::InsufficientMiddles);
    }

    let entries: Vec<&RelayEntry> = relays.iter().filter(|r| r.mode == RelayMode::Entry).collect();
    let middles: Vec<&RelayEntry> = relays.iter().filter(|r| r.mode == RelayMode::Middle).collect();
    let exits: Vec<&RelayEntry> = relays.iter().filter(|r| r.mode == RelayMode::Exit).collect();

    let entry = pick_preferred_or_best(&entries, prefer_entry_id, rng).ok_or(PathError::NoEntryRelay)?;
    let exit = pick_preferred_or_best(&exits, prefer_exit_id, rng).ok_or(PathError::NoExitRelay)?;

    let middle_count = hop_count - 2;
    let mut chosen_middles: Vec<&RelayEntry> = Vec::with_capacity(middle_count);
    let mut remaining: Vec<&RelayEntry> = middles
        .into_iter()
        .filter(|m| m.id != entry.id && m.id != exit.id)
        .collect();

    for _ in 0..middle_count {
        if remaining.is_empty() {
            return Err(PathError::InsufficientMiddles);
        }
        let pick = pick_best(&remaining, rng).expect("remaining is non-empty");
        let pick_id = pick.id.clone();
        chosen_middles.push(pick);
        remaining.retain(|m| m.id != pick_id);
    }

    let mut path = Vec::with_capacity(hop_count);
    path.push(entry.clone());
    path.extend(chosen_middles.into_iter().cloned());
    path.push(exit.clone());
    Ok(path)
}

fn pick_preferred_or_best<'a>(
    pool: &[&'a RelayEntry],
    preferred_id: Option<&str>,
    rng: &mut impl Rng,
) -> Option<&'a RelayEntry> {
    if let Some(id) = preferred_id {
        if let Some(found) = pool.iter().find(|r| r.id == id) {
            return Some(found);
        }
    }
    pick_best(pool, rng)
}

fn pick_best<'a>(pool: &[&'a RelayEntry], rng: &mut impl Rng) -> Option<&'a RelayEntry> {
    if pool.is_empty() {
        return None;
    }
    let best_score = pool.iter().map(|r| r.trust_score).fold(f64::MIN, f64::max);
    let tied: Vec<&&RelayEntry> = pool
        .iter()
        .filter(|r| (r.trust_score - best_score).abs() < f64::EPSILON)
        .collect();
    let idx = rng.gen_range(0..tied.len());
    Some(tied[idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn relay(id: &str, mode: RelayMode, trust: f64) -> RelayEntry {
        RelayEntry {
            id: id.into(),
            public_key: "deadbeef".into(),
            endpoint: format!("wss://{id}:9001"),
            mode,
            version: "1.0.0".into(),
            capabilities: vec![],
            max_bandwidth: 1_000_000,
            current_load: 0.0,
            uptime_seconds: 0,
            last_seen: Utc::now(),
            registered_at: Utc::now(),
            trust_score: trust,
            online: true,
            country: None,
            asn: None,
        }
    }

    #[test]
    fn three_hop_path_has_distinct_relays_in_the_right_roles() {
        let relays = vec![
            relay("e1", RelayMode::Entry, 90.0),
            relay("e2", RelayMode::Entry, 80.0),
            relay("m1", RelayMode::Middle, 95.0),
            relay("m2", RelayMode::Middle, 60.0),
            relay("x1", RelayMode::Exit, 70.0),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let path = select_relays_for_circuit(&relays, 3, None, None, &mut rng).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].mode, RelayMode::Entry);
        assert_eq!(path[1].mode, RelayMode::Middle);
        assert_eq!(path[2].mode, RelayMode::Exit);
        assert_eq!(path[0].id, "e1");
        assert_eq!(path[1].id, "m1");
        assert_eq!(path[2].id, "x1");
    }

    #[test]
    fn missing_entry_or_exit_errors() {
        let relays = vec![relay("m1", RelayMode::Middle, 50.0)];
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let err = select_relays_for_circuit(&relays, 3, None, None, &mut rng).unwrap_err();
        assert_eq!(err, PathError::NoEntryRelay);
    }

    #[test]
    fn insufficient_middles_errors_rather_than_reusing_entry_or_exit() {
        let relays = vec![
            relay("e1", RelayMode::Entry, 80.0),
            relay("x1", RelayMode::Exit, 80.0),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let err = select_relays_for_circuit(&relays, 4, None, None, &mut rng).unwrap_err();
        assert_eq!(err, PathError::InsufficientMiddles);
    }

    #[test]
    fn preferred_entry_wins_even_over_higher_trust() {
        let relays = vec![
            relay("e1", RelayMode::Entry, 99.0),
            relay("e2", RelayMode::Entry, 10.0),
            relay("m1", RelayMode::Middle, 50.0),
            relay("x1", RelayMode::Exit, 50.0),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let path = select_relays_for_circuit(&relays, 3, Some("e2"), None, &mut rng).unwrap();
        assert_eq!(path[0].id, "e2");
    }

    #[test]
    fn ties_are_broken_across_both_candidates_over_many_draws() {
        let relays = vec![
            relay("e1", RelayMode::Entry, 50.0),
            relay("e2", RelayMode::Entry, 50.0),
            relay("m1", RelayMode::Middle, 50.0),
            relay("x1", RelayMode::Exit, 50.0),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut saw_e1 = false;
        let mut saw_e2 = false;
        for _ in 0..50 {
            let path = select_relays_for_circuit(&relays, 3, None, None, &mut rng).unwrap();
            match path[0].id.as_str() {
                "e1" => saw_e1 = true,
                "e2" => saw_e2 = true,
                _ => unreachable!(),
            }
        }
        assert!(saw_e1 && saw_e2);
    }
}
