//! Cross-subsystem integration flows.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod reconciliation;

#[cfg(test)]
mod submission;
