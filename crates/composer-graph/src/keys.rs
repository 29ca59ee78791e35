use crate::{KeyPolicy, NodeKey};
use uuid::Uuid;

const KEY_PREFIX: &str = "node";

/// Mints and repairs node keys on import.
#[derive(Clone, Debug)]
pub struct KeyAllocator {
    policy: KeyPolicy,
    counter: u64,
}

impl KeyAllocator {
    pub fn new(policy: KeyPolicy) -> Self {
        Self { policy, counter: 0 }
    }

    pub fn policy(&self) -> KeyPolicy {
        self.policy
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }

    /// Picks the key for an imported node.
    ///
    /// With `refresh` every node gets a new key. Otherwise the incoming key is
    /// kept unless it is missing, it is a sequential key at or below the
    /// counter (local policy only), or `exists` reports it as taken.
    pub fn assign(
        &mut self,
        incoming: Option<&str>,
        refresh: bool,
        exists: impl Fn(&str) -> bool,
    ) -> NodeKey {
        let incoming = incoming.filter(|key| !key.is_empty());
        let Some(key) = incoming.filter(|_| !refresh) else {
            return self.mint(&exists);
        };

        let sequence = match self.policy {
            KeyPolicy::LocalSequential => sequential_suffix(key),
            KeyPolicy::GloballyUnique => None,
        };
        if let Some(sequence) = sequence {
            if sequence <= self.counter {
                tracing::debug!(key, counter = self.counter, "sequential key already allocated; minting a new one");
                return self.mint(&exists);
            }
            self.counter = sequence;
        }

        if exists(key) {
            tracing::warn!(key, "incoming node key collides with an existing node; minting a new one");
            return self.mint(&exists);
        }
        key.to_string()
    }

    pub fn mint(&mut self, exists: &impl Fn(&str) -> bool) -> NodeKey {
        loop {
            let candidate = match self.policy {
                KeyPolicy::GloballyUnique => unique_key(),
                KeyPolicy::LocalSequential => match self.counter.checked_add(1) {
                    Some(next) => {
                        self.counter = next;
                        format!("{KEY_PREFIX}{next}")
                    }
                    None => {
                        tracing::warn!(counter = self.counter, "sequential key counter exhausted; minting a unique key");
                        unique_key()
                    }
                },
            };
            if !exists(&candidate) {
                return candidate;
            }
        }
    }
}

fn unique_key() -> NodeKey {
    format!("{KEY_PREFIX}-{}", Uuid::new_v4().simple())
}

fn sequential_suffix(key: &str) -> Option<u64> {
    key.strip_prefix(KEY_PREFIX)?.parse().ok()
}
