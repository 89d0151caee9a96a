//! Human-facing ticket numbers: `GRV-<base36 millis>-<4 char base36 random>`.
//!
//! The format is an external contract. Uniqueness within one generator is
//! guaranteed by tracking the suffixes issued for the current millisecond;
//! across processes the store re-checks before insert.

use crate::{rng::SuffixRng, types::Timestamp};
use std::collections::HashSet;

pub const TICKET_PREFIX: &str = "GRV";
const SUFFIX_LEN: usize = 4;
const SUFFIX_SPACE: u64 = 36 * 36 * 36 * 36;
const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub struct TicketGenerator {
    rng: SuffixRng,
    last_millis: i64,
    issued: HashSet<u64>,
}

impl TicketGenerator {
    pub fn new(rng: SuffixRng) -> Self {
        Self {
            rng,
            last_millis: i64::MIN,
            issued: HashSet::new(),
        }
    }

    /// Issue the next ticket number for a complaint created at `now`.
    /// If the clock steps backwards the last seen millisecond is reused, so
    /// the timestamp component never decreases.
    pub fn next(&mut self, now: Timestamp) -> String {
        let millis = now.timestamp_millis().max(0);
        if millis > self.last_millis {
            self.last_millis = millis;
            self.issued.clear();
        }
        loop {
            if self.issued.len() as u64 >= SUFFIX_SPACE {
                self.last_millis += 1;
                self.issued.clear();
            }
            let suffix = self.rng.next_below(SUFFIX_SPACE);
            if self.issued.insert(suffix) {
                return format!(
                    "{TICKET_PREFIX}-{}-{}",
                    to_base36(self.last_millis as u64),
                    pad_left(to_base36(suffix), SUFFIX_LEN),
                );
            }
        }
    }
}

/// Uppercase base36 rendering of `n`.
pub fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn pad_left(s: String, width: usize) -> String {
    format!("{s:0>width$}")
}

/// Checks the shape of a ticket number without consulting the store.
pub fn is_well_formed(ticket: &str) -> bool {
    let mut parts = ticket.split('-');
    let (Some(prefix), Some(stamp), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let base36 = |s: &str| !s.is_empty() && s.bytes().all(|b| DIGITS.contains(&b));
    prefix == TICKET_PREFIX && base36(stamp) && suffix.len() == SUFFIX_LEN && base36(suffix)
}
