//! Read-only queries.

use nos_core::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::error::JobsError;
use crate::job::{Job, JobStatus};
use crate::market::Market;
use crate::program::JobsProgram;

/// Predicates over job records. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilter {
    /// Jobs of this market.
    pub market: Option<Address>,
    /// Jobs in this status.
    pub status: Option<JobStatus>,
    /// Jobs run by this node.
    pub node: Option<Address>,
    /// Jobs listed by this project.
    pub project: Option<Address>,
    /// Jobs that have exceeded their market's timeout at this time.
    pub timed_out_at: Option<i64>,
}

impl JobFilter {
    /// Matches every job.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to `market`.
    #[must_use]
    pub const fn market(mut self, market: Address) -> Self {
        self.market = Some(market);
        self
    }

    /// Restricts to `status`.
    #[must_use]
    pub const fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to jobs run by `node`.
    #[must_use]
    pub const fn node(mut self, node: Address) -> Self {
        self.node = Some(node);
        self
    }

    /// Restricts to jobs listed by `project`.
    #[must_use]
    pub const fn project(mut self, project: Address) -> Self {
        self.project = Some(project);
        self
    }

    /// Restricts to jobs timed out at `now`.
    #[must_use]
    pub const fn timed_out_at(mut self, now: i64) -> Self {
        self.timed_out_at = Some(now);
        self
    }

    fn matches(&self, job: &Job, market: Option<&Market>) -> bool {
        self.market.is_none_or(|m| m == job.market)
            && self.status.is_none_or(|s| s == job.status)
            && self.node.is_none_or(|n| n == job.node)
            && self.project.is_none_or(|p| p == job.project)
            && self
                .timed_out_at
                .is_none_or(|now| market.is_some_and(|m| job.is_timed_out(m, now)))
    }
}

impl JobsProgram {
    /// Looks up a market.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::MarketNotFound` if there is none.
    pub fn market(&self, key: &Address) -> Result<&Market, JobsError> {
        self.market_ref(key)
    }

    /// Looks up a job.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::JobNotFound` if there is none.
    pub fn job(&self, key: &Address) -> Result<&Job, JobsError> {
        self.job_ref(key)
    }

    /// Jobs matching `filter`, ordered by key.
    #[must_use]
    pub fn jobs(&self, filter: &JobFilter) -> Vec<(Address, &Job)> {
        self.state
            .jobs
            .iter()
            .filter(|(_, job)| filter.matches(job, self.state.markets.get(&job.market)))
            .map(|(key, job)| (*key, job))
            .collect()
    }

    /// Markets ordered by key.
    #[must_use]
    pub fn markets(&self) -> Vec<(Address, &Market)> {
        self.state
            .markets
            .iter()
            .map(|(key, market)| (*key, market))
            .collect()
    }

    /// Balance of a market's escrow vault.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::MarketNotFound` if there is none.
    pub fn vault_balance(&self, market: &Address) -> Result<Amount, JobsError> {
        let vault = self.market_ref(market)?.vault;
        Ok(self.state.ledger.balance(&vault))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::NodeCredentials;
    use crate::config::{MarketConfig, ProgramConfig};
    use crate::job::JobSlot;
    use nos_core::{Clock, ContentRef, ManualClock};
    use nos_token::DURATION_MIN;
    use std::sync::Arc;

    struct Fixture {
        program: JobsProgram,
        clock: ManualClock,
        market: Address,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new(10_000);
        let mut program = JobsProgram::new(ProgramConfig::default(), Arc::new(clock.clone()));
        let market = Address::unique();
        program
            .open(
                Address::unique(),
                market,
                Address::unique(),
                MarketConfig {
                    job_timeout: 100,
                    ..MarketConfig::default()
                },
            )
            .expect("open");
        Fixture {
            program,
            clock,
            market,
        }
    }

    fn run_job(f: &mut Fixture) -> (Address, Address, Address) {
        let project = Address::unique();
        let node = Address::unique();
        f.program.airdrop(project, Amount::from_nos(5)).expect("airdrop");
        f.program.airdrop(node, Amount::from_nos(5)).expect("airdrop");
        let stake = f
            .program
            .stake(node, Amount::from_nos(5), DURATION_MIN)
            .expect("stake");
        f.program
            .list(project, f.market, JobSlot::Placeholder, ContentRef::from_content(b"q"))
            .expect("list");
        let job = Address::unique();
        f.program
            .work(node, f.market, JobSlot::Fresh(job), &NodeCredentials::stake_only(stake))
            .expect("work");
        (job, node, project)
    }

    #[test]
    fn filters_by_status_and_market() {
        let mut f = fixture();
        let (first, node, _) = run_job(&mut f);
        let (second, _, _) = run_job(&mut f);
        f.program
            .finish(node, first, ContentRef::from_content(b"r"))
            .expect("finish");

        let running = f.program.jobs(&JobFilter::all().market(f.market).status(JobStatus::Running));
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].0, second);

        let done = f.program.jobs(&JobFilter::all().status(JobStatus::Done));
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].0, first);

        assert!(f.program.jobs(&JobFilter::all().market(Address::unique())).is_empty());
    }

    #[test]
    fn filters_by_participant() {
        let mut f = fixture();
        let (job, node, project) = run_job(&mut f);
        run_job(&mut f);

        let by_node = f.program.jobs(&JobFilter::all().node(node));
        assert_eq!(by_node.iter().map(|(k, _)| *k).collect::<Vec<_>>(), vec![job]);
        let by_project = f.program.jobs(&JobFilter::all().project(project));
        assert_eq!(by_project.len(), 1);
    }

    #[test]
    fn results_are_sorted_by_key() {
        let mut f = fixture();
        for _ in 0..4 {
            run_job(&mut f);
        }
        let keys: Vec<Address> = f.program.jobs(&JobFilter::all()).iter().map(|(k, _)| *k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn timed_out_jobs() {
        let mut f = fixture();
        let (job, _, _) = run_job(&mut f);
        let now = f.clock.now();
        assert!(f.program.jobs(&JobFilter::all().timed_out_at(now + 99)).is_empty());
        let late = f.program.jobs(&JobFilter::all().timed_out_at(now + 100));
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].0, job);
    }

    #[test]
    fn lookups_report_missing_records() {
        let f = fixture();
        let missing = Address::unique();
        assert_eq!(f.program.job(&missing), Err(JobsError::JobNotFound(missing)));
        assert_eq!(f.program.market(&missing), Err(JobsError::MarketNotFound(missing)));
        assert_eq!(f.program.vault_balance(&f.market), Ok(Amount::ZERO));
        assert_eq!(f.program.markets().len(), 1);
    }
}
