//! Gap-limit account discovery
//!
//! Accounts are probed in batches of `batch_size`. Within a batch the count
//! stops at the first unused account. Only a batch in which every account is
//! used triggers another batch, starting right after it, so the result is the
//! number of contiguously used accounts from index 0.
//!
//! A gap of `batch_size` or more unused accounts before a used one hides the
//! later account. That is inherent to gap-limit discovery.

use std::sync::Arc;

use hdspend_core::{AccountXpubDeriver, AddressDeriver};

use crate::probe::{AddressUsageProbe, AddressUsageSource};
use crate::DiscoveryError;

/// Default accounts per batch
pub const DEFAULT_BATCH_SIZE: u32 = 10;

/// Identifiers derived for one batch of account indices
struct Batch {
    /// One entry per account, each holding that account's identifiers
    accounts: Vec<Vec<String>>,
    /// The deriver had nothing past the last account in this batch
    exhausted: bool,
}

/// Counts how many HD accounts have on-chain history
#[derive(Clone)]
pub struct AccountDiscovery {
    probe: AddressUsageProbe,
}

impl AccountDiscovery {
    pub fn new(source: Arc<dyn AddressUsageSource>) -> Self {
        Self {
            probe: AddressUsageProbe::new(source),
        }
    }

    /// Number of contiguously used accounts starting at index 0.
    ///
    /// `derive` maps an account index to the identifiers (addresses or xpubs)
    /// that represent it; the account is used if any of them has a
    /// transaction. Returning `Ok(None)` means no account exists at that index.
    ///
    /// Any lookup failure aborts the scan; no partial count is returned.
    pub async fn discover_used_account_count<F>(
        &self,
        batch_size: u32,
        mut derive: F,
    ) -> Result<u32, DiscoveryError>
    where
        F: FnMut(u32) -> Result<Option<Vec<String>>, DiscoveryError>,
    {
        if batch_size == 0 {
            return Err(DiscoveryError::InvalidBatchSize);
        }

        let mut used: u32 = 0;
        let mut start: u32 = 0;

        loop {
            let batch = derive_batch(&mut derive, start, batch_size)?;
            if batch.accounts.is_empty() {
                return Ok(used);
            }

            let identifiers: Vec<String> = batch.accounts.iter().flatten().cloned().collect();
            log::debug!(
                "Probing accounts {}..{} ({} identifiers)",
                start,
                start as u64 + batch.accounts.len() as u64,
                identifiers.len()
            );
            let counts = self.probe.probe(&identifiers).await?;

            let leading = leading_used(&batch.accounts, &counts);
            used += leading;

            if (leading as usize) < batch.accounts.len() || batch.exhausted {
                log::debug!("Discovery finished with {} used accounts", used);
                return Ok(used);
            }

            start = match start.checked_add(batch_size) {
                Some(next) => next,
                None => return Ok(used),
            };
        }
    }

    /// Discover accounts over their account-level xpubs (all purposes)
    pub async fn discover_accounts(
        &self,
        batch_size: u32,
        deriver: &AccountXpubDeriver,
    ) -> Result<u32, DiscoveryError> {
        self.discover_used_account_count(batch_size, |index| Ok(deriver.derive(index)?))
            .await
    }

    /// Discover over single receive addresses below one xpub
    pub async fn discover_addresses(
        &self,
        batch_size: u32,
        deriver: &AddressDeriver,
    ) -> Result<u32, DiscoveryError> {
        self.discover_used_account_count(batch_size, |index| {
            Ok(deriver.derive(index)?.map(|address| vec![address]))
        })
        .await
    }
}

fn derive_batch<F>(derive: &mut F, start: u32, batch_size: u32) -> Result<Batch, DiscoveryError>
where
    F: FnMut(u32) -> Result<Option<Vec<String>>, DiscoveryError>,
{
    let mut accounts = Vec::with_capacity(batch_size as usize);

    for offset in 0..batch_size {
        let Some(index) = start.checked_add(offset) else {
            return Ok(Batch {
                accounts,
                exhausted: true,
            });
        };
        match derive(index)? {
            Some(identifiers) => accounts.push(identifiers),
            None => {
                return Ok(Batch {
                    accounts,
                    exhausted: true,
                })
            }
        }
    }

    Ok(Batch {
        accounts,
        exhausted: false,
    })
}

/// Accounts before the first one with no used identifier
fn leading_used(accounts: &[Vec<String>], counts: &[u64]) -> u32 {
    let mut offset = 0;
    let mut leading = 0;

    for identifiers in accounts {
        let end = offset + identifiers.len();
        let used = counts[offset..end].iter().any(|&c| c > 0);
        offset = end;
        if !used {
            break;
        }
        leading += 1;
    }

    leading
}
