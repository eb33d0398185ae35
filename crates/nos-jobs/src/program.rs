//! The job market state machine.
//!
//! [`JobsProgram`] owns every market, job, and the token world they settle
//! against. Each operation validates all of its preconditions before it
//! touches state, and every token movement of an operation goes through one
//! atomic ledger batch, so a rejected call leaves nothing behind.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use nos_core::{Address, Amount, Clock, ContentRef};
use nos_token::{associated_address, Ledger, LedgerError, MetadataRegistry, Nft, Staking, Transfer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::access::{AccessControl, NodeCredentials};
use crate::config::{MarketConfig, ProgramConfig};
use crate::error::JobsError;
use crate::instruction::Outcome;
use crate::job::{Job, JobSlot, JobStatus};
use crate::market::{vault_address, Market};
use crate::queue::QueuedJob;

/// Everything the program persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramState {
    /// Program-wide settings.
    pub config: ProgramConfig,
    /// Open markets by key.
    pub markets: BTreeMap<Address, Market>,
    /// Live jobs by key.
    pub jobs: BTreeMap<Address, Job>,
    /// Every key ever taken by a market, placeholder, or job.
    pub retired: BTreeSet<Address>,
    /// Token accounts.
    pub ledger: Ledger,
    /// Stake accounts.
    pub staking: Staking,
    /// NFT metadata.
    pub metadata: MetadataRegistry,
}

impl ProgramState {
    /// Creates an empty world for `config`.
    #[must_use]
    pub fn new(config: ProgramConfig) -> Self {
        let mut ledger = Ledger::new();
        ledger.ensure_account(config.fee_collector, config.fee_collector, config.mint);
        Self {
            config,
            markets: BTreeMap::new(),
            jobs: BTreeMap::new(),
            retired: BTreeSet::new(),
            ledger,
            staking: Staking::new(config.mint),
            metadata: MetadataRegistry::new(),
        }
    }
}

impl Default for ProgramState {
    fn default() -> Self {
        Self::new(ProgramConfig::default())
    }
}

/// The job market program.
pub struct JobsProgram {
    pub(crate) state: ProgramState,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for JobsProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobsProgram")
            .field("markets", &self.state.markets.len())
            .field("jobs", &self.state.jobs.len())
            .finish_non_exhaustive()
    }
}

impl JobsProgram {
    /// Creates a program with an empty world.
    #[must_use]
    pub fn new(config: ProgramConfig, clock: Arc<dyn Clock>) -> Self {
        Self::from_state(ProgramState::new(config), clock)
    }

    /// Resumes a program from a saved state.
    #[must_use]
    pub fn from_state(state: ProgramState, clock: Arc<dyn Clock>) -> Self {
        Self { state, clock }
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> &ProgramState {
        &self.state
    }

    /// Consumes the program, returning its state.
    #[must_use]
    pub fn into_state(self) -> ProgramState {
        self.state
    }

    /// The program's current time.
    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// The NOS token account of `owner`.
    #[must_use]
    pub fn token_account(&self, owner: &Address) -> Address {
        associated_address(owner, &self.state.config.mint)
    }

    // ------------------------------------------------------------------
    // World setup
    // ------------------------------------------------------------------

    /// Mints `amount` NOS to `owner`'s token account.
    ///
    /// # Errors
    ///
    /// Returns an error if the balance would overflow.
    pub fn airdrop(&mut self, owner: Address, amount: Amount) -> Result<Address, JobsError> {
        let account = self
            .state
            .ledger
            .get_or_create_associated(owner, self.state.config.mint);
        self.state.ledger.mint_to(&account, amount)?;
        info!(owner = %owner, amount = %amount, "airdrop");
        Ok(account)
    }

    /// Stakes `amount` NOS of `authority` for `duration` seconds.
    ///
    /// # Errors
    ///
    /// Returns the staking error on invalid parameters or missing funds.
    pub fn stake(
        &mut self,
        authority: Address,
        amount: Amount,
        duration: u64,
    ) -> Result<Address, JobsError> {
        let from = self.token_account(&authority);
        Ok(self
            .state
            .staking
            .stake(&mut self.state.ledger, authority, from, amount, duration)?)
    }

    /// Starts unstaking the stake of `authority`.
    ///
    /// # Errors
    ///
    /// Returns the staking error if there is no active stake.
    pub fn unstake(&mut self, authority: &Address) -> Result<(), JobsError> {
        let now = self.now();
        Ok(self.state.staking.unstake(authority, now)?)
    }

    /// Mints an NFT to `owner`, optionally in a verified collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the token account cannot be funded.
    pub fn mint_nft(
        &mut self,
        owner: Address,
        name: &str,
        collection: Option<Address>,
    ) -> Result<Nft, JobsError> {
        Ok(self
            .state
            .metadata
            .create_nft(&mut self.state.ledger, owner, name, collection)?)
    }

    // ------------------------------------------------------------------
    // Market lifecycle
    // ------------------------------------------------------------------

    /// Opens a market at `market_key`, reserving `placeholder` as its
    /// permanent placeholder job key.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::AccountInUse` if either key was ever used.
    pub fn open(
        &mut self,
        signer: Address,
        market_key: Address,
        placeholder: Address,
        config: MarketConfig,
    ) -> Result<Outcome, JobsError> {
        for key in [market_key, placeholder] {
            if self.state.retired.contains(&key) {
                return Err(JobsError::AccountInUse(key));
            }
        }
        if market_key == placeholder {
            return Err(JobsError::AccountInUse(placeholder));
        }

        let mint = self.state.config.mint;
        let vault = vault_address(&market_key, &mint);
        self.state.ledger.create_account(vault, vault, mint)?;
        self.state.retired.extend([market_key, placeholder]);
        self.state
            .markets
            .insert(market_key, Market::new(signer, vault, placeholder, config));

        info!(
            market = %market_key,
            authority = %signer,
            price = %config.job_price,
            job_type = %config.job_type,
            "market opened"
        );
        Ok(Outcome::MarketOpened {
            market: market_key,
            vault,
            placeholder,
        })
    }

    /// Replaces the configuration of a market.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::Unauthorized` unless `signer` opened the market.
    pub fn update(
        &mut self,
        signer: Address,
        market_key: Address,
        config: MarketConfig,
    ) -> Result<Outcome, JobsError> {
        let market = self.market_mut(&market_key)?;
        if market.authority != signer {
            return Err(JobsError::Unauthorized);
        }
        market.config = config;

        info!(market = %market_key, price = %config.job_price, "market updated");
        Ok(Outcome::MarketUpdated { market: market_key })
    }

    /// Closes a market whose vault and queue are empty.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::Unauthorized`, `JobsError::VaultNotEmpty`, or
    /// `JobsError::QueueNotEmpty`.
    pub fn close(&mut self, signer: Address, market_key: Address) -> Result<Outcome, JobsError> {
        let market = self.market_ref(&market_key)?;
        if market.authority != signer {
            return Err(JobsError::Unauthorized);
        }
        if !self.state.ledger.balance(&market.vault).is_zero() {
            return Err(JobsError::VaultNotEmpty);
        }
        if !market.queue.is_empty() {
            return Err(JobsError::QueueNotEmpty);
        }

        let vault = market.vault;
        self.state.ledger.close_account(&vault, &vault)?;
        self.state.markets.remove(&market_key);

        info!(market = %market_key, "market closed");
        Ok(Outcome::MarketClosed { market: market_key })
    }

    // ------------------------------------------------------------------
    // Matching
    // ------------------------------------------------------------------

    /// Lists a job on a market, paying its price into escrow and the
    /// platform fee to the collector.
    ///
    /// If a node is waiting the job starts running at `slot` right away;
    /// otherwise it joins the job queue and `slot` is left unused.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::JobConstraintNotSatisfied` if a node is waiting
    /// and `slot` cannot hold a new job, or a ledger error if the project
    /// cannot pay.
    pub fn list(
        &mut self,
        signer: Address,
        market_key: Address,
        slot: JobSlot,
        payload: ContentRef,
    ) -> Result<Outcome, JobsError> {
        let now = self.now();
        let market = self.market_ref(&market_key)?;
        let price = market.config.job_price;
        let vault = market.vault;
        let job_key = match market.queue.front_node() {
            Some(_) => Some(self.fresh_job_key(market, slot)?),
            None => None,
        };

        let fee = self.state.config.fee_for(price);
        let from = self.token_account(&signer);
        let legs: Vec<Transfer> = [(vault, price), (self.state.config.fee_collector, fee)]
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(to, amount)| Transfer {
                from,
                to,
                authority: signer,
                amount,
            })
            .collect();
        self.state.ledger.transfer_batch(&legs)?;

        let market = self.market_mut(&market_key)?;
        let Some(job_key) = job_key else {
            let position = market.queue.push_job(QueuedJob {
                user: signer,
                payload,
                price,
            })?;
            debug!(market = %market_key, position, "job queued");
            info!(market = %market_key, project = %signer, price = %price, fee = %fee, "job listed");
            return Ok(Outcome::JobQueued {
                market: market_key,
                position,
            });
        };

        let node = market
            .queue
            .pop_node()
            .ok_or(JobsError::JobConstraintNotSatisfied)?;
        debug!(market = %market_key, node = %node, "node dequeued");
        self.insert_job(
            job_key,
            Job::running(market_key, signer, node, payload, price, now),
        );

        info!(market = %market_key, job = %job_key, project = %signer, node = %node, "job listed and matched");
        Ok(Outcome::JobMatched {
            job: job_key,
            node,
            project: signer,
            price,
        })
    }

    /// Offers a node's capacity to a market.
    ///
    /// If a job is waiting it starts running at `slot` with the node
    /// assigned; otherwise the node joins the node queue.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::JobConstraintNotSatisfied` if a job is waiting and
    /// `slot` cannot hold it, an admission error, or
    /// `JobsError::NodeAlreadyQueued`.
    pub fn work(
        &mut self,
        signer: Address,
        market_key: Address,
        slot: JobSlot,
        credentials: &NodeCredentials,
    ) -> Result<Outcome, JobsError> {
        let now = self.now();
        let market = self.market_ref(&market_key)?;
        let job_key = match market.queue.front_job() {
            Some(_) => Some(self.fresh_job_key(market, slot)?),
            None => None,
        };
        self.access().admit(&signer, credentials, &market.config)?;

        let market = self.market_mut(&market_key)?;
        let Some(job_key) = job_key else {
            if market.queue.contains_node(&signer) {
                return Err(JobsError::NodeAlreadyQueued);
            }
            let position = market.queue.push_node(signer)?;
            debug!(market = %market_key, node = %signer, position, "node queued");
            return Ok(Outcome::NodeQueued {
                market: market_key,
                position,
            });
        };

        let entry = market
            .queue
            .pop_job()
            .ok_or(JobsError::JobConstraintNotSatisfied)?;
        debug!(market = %market_key, project = %entry.user, "job dequeued");
        self.insert_job(
            job_key,
            Job::running(market_key, entry.user, signer, entry.payload, entry.price, now),
        );

        info!(market = %market_key, job = %job_key, node = %signer, "job matched");
        Ok(Outcome::JobMatched {
            job: job_key,
            node: signer,
            project: entry.user,
            price: entry.price,
        })
    }

    // ------------------------------------------------------------------
    // Running jobs
    // ------------------------------------------------------------------

    /// Completes a running job, paying its price to the node.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::Unauthorized` unless `signer` runs the job, or
    /// `JobsError::JobInWrongState` unless it is running.
    pub fn finish(
        &mut self,
        signer: Address,
        job_key: Address,
        result: ContentRef,
    ) -> Result<Outcome, JobsError> {
        let now = self.now();
        let job = self.job_ref(&job_key)?;
        if job.node != signer {
            return Err(JobsError::Unauthorized);
        }
        if job.status != JobStatus::Running {
            return Err(JobsError::JobInWrongState);
        }

        let (market, price) = (job.market, job.price);
        self.release(&market, signer, price)?;

        let job = self.job_mut(&job_key)?;
        job.transition_to(JobStatus::Done)?;
        job.time_end = now;
        job.payload = result;

        info!(market = %market, job = %job_key, node = %signer, paid = %price, "job finished");
        Ok(Outcome::JobFinished {
            job: job_key,
            node: signer,
            paid: price,
        })
    }

    /// Abandons a running job; escrow stays in the vault.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::Unauthorized` unless `signer` runs the job, or
    /// `JobsError::JobInWrongState` unless it is running.
    pub fn quit(&mut self, signer: Address, job_key: Address) -> Result<Outcome, JobsError> {
        let job = self.job_mut(&job_key)?;
        if job.node != signer {
            return Err(JobsError::Unauthorized);
        }
        job.transition_to(JobStatus::Quit)?;

        info!(market = %job.market, job = %job_key, node = %signer, "job quit");
        Ok(Outcome::JobQuit { job: job_key })
    }

    /// Takes over an abandoned job. The original start time is kept.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::JobInWrongState` unless the job was quit, then any
    /// credential error.
    pub fn claim(
        &mut self,
        signer: Address,
        job_key: Address,
        credentials: &NodeCredentials,
    ) -> Result<Outcome, JobsError> {
        let job = self.job_ref(&job_key)?;
        if job.status != JobStatus::Quit {
            return Err(JobsError::JobInWrongState);
        }
        let market = self.market_ref(&job.market)?;
        self.access()
            .admit_claim(&signer, credentials, &market.config)?;

        let job = self.job_mut(&job_key)?;
        job.transition_to(JobStatus::Running)?;
        let previous = std::mem::replace(&mut job.node, signer);

        info!(market = %job.market, job = %job_key, node = %signer, previous = %previous, "job claimed");
        Ok(Outcome::JobClaimed {
            job: job_key,
            node: signer,
        })
    }

    // ------------------------------------------------------------------
    // Reclamation
    // ------------------------------------------------------------------

    /// Removes a finished job once its market's expiration has elapsed.
    ///
    /// Anyone may clean. Jobs of closed markets expire immediately.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::JobInWrongState` unless the job is done, or
    /// `JobsError::JobNotExpired` before `time_end + job_expiration`.
    pub fn clean(&mut self, signer: Address, job_key: Address) -> Result<Outcome, JobsError> {
        let now = self.now();
        let job = self.job_ref(&job_key)?;
        if job.status != JobStatus::Done {
            return Err(JobsError::JobInWrongState);
        }
        let expiration = self
            .state
            .markets
            .get(&job.market)
            .map_or(0, |market| market.config.job_expiration);
        if now < job.expires_at(expiration) {
            return Err(JobsError::JobNotExpired);
        }

        let record = self
            .state
            .jobs
            .remove(&job_key)
            .ok_or(JobsError::JobNotFound(job_key))?;

        info!(market = %record.market, job = %job_key, by = %signer, "job cleaned");
        Ok(Outcome::JobCleaned {
            job: job_key,
            record,
        })
    }

    /// Refunds an abandoned job to its project and removes it.
    ///
    /// # Errors
    ///
    /// Returns `JobsError::Unauthorized` unless `signer` listed the job, or
    /// `JobsError::JobInWrongState` unless it was quit.
    pub fn recover(&mut self, signer: Address, job_key: Address) -> Result<Outcome, JobsError> {
        let job = self.job_ref(&job_key)?;
        if job.project != signer {
            return Err(JobsError::Unauthorized);
        }
        if job.status != JobStatus::Quit {
            return Err(JobsError::JobInWrongState);
        }

        let (market, price) = (job.market, job.price);
        self.release(&market, signer, price)?;
        self.state.jobs.remove(&job_key);

        info!(market = %market, job = %job_key, project = %signer, refunded = %price, "job recovered");
        Ok(Outcome::JobRecovered {
            job: job_key,
            refunded: price,
        })
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn access(&self) -> AccessControl<'_> {
        AccessControl::new(&self.state.ledger, &self.state.staking, &self.state.metadata)
    }

    pub(crate) fn market_ref(&self, key: &Address) -> Result<&Market, JobsError> {
        self.state
            .markets
            .get(key)
            .ok_or(JobsError::MarketNotFound(*key))
    }

    fn market_mut(&mut self, key: &Address) -> Result<&mut Market, JobsError> {
        self.state
            .markets
            .get_mut(key)
            .ok_or(JobsError::MarketNotFound(*key))
    }

    pub(crate) fn job_ref(&self, key: &Address) -> Result<&Job, JobsError> {
        self.state.jobs.get(key).ok_or(JobsError::JobNotFound(*key))
    }

    fn job_mut(&mut self, key: &Address) -> Result<&mut Job, JobsError> {
        self.state
            .jobs
            .get_mut(key)
            .ok_or(JobsError::JobNotFound(*key))
    }

    /// Resolves the key a match would write its job to.
    fn fresh_job_key(&self, market: &Market, slot: JobSlot) -> Result<Address, JobsError> {
        match slot {
            JobSlot::Fresh(key) if key != market.placeholder && !self.state.retired.contains(&key) => {
                Ok(key)
            }
            _ => Err(JobsError::JobConstraintNotSatisfied),
        }
    }

    fn insert_job(&mut self, key: Address, job: Job) {
        self.state.retired.insert(key);
        self.state.jobs.insert(key, job);
    }

    /// Pays `amount` out of the market vault to `recipient`'s token account.
    fn release(&mut self, market: &Address, recipient: Address, amount: Amount) -> Result<(), JobsError> {
        if amount.is_zero() {
            return Ok(());
        }
        let vault = self.market_ref(market)?.vault;
        let have = self.state.ledger.balance(&vault);
        if have < amount {
            return Err(LedgerError::InsufficientFunds {
                account: vault,
                have,
                need: amount,
            }
            .into());
        }

        let to = self
            .state
            .ledger
            .get_or_create_associated(recipient, self.state.config.mint);
        self.state.ledger.transfer(Transfer {
            from: vault,
            to,
            authority: vault,
            amount,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nos_core::ManualClock;
    use nos_token::{stake_address, DURATION_MIN};
    use proptest::prelude::*;
    use test_case::test_case;

    const START: i64 = 1_700_000_000;

    struct Harness {
        program: JobsProgram,
        clock: ManualClock,
        market: Address,
        authority: Address,
    }

    impl Harness {
        fn new(config: MarketConfig) -> Self {
            let clock = ManualClock::new(START);
            let mut program = JobsProgram::new(ProgramConfig::default(), Arc::new(clock.clone()));
            let authority = Address::unique();
            let market = Address::unique();
            program
                .open(authority, market, Address::unique(), config)
                .expect("open");
            Self {
                program,
                clock,
                market,
                authority,
            }
        }

        fn project(&mut self, nos: u64) -> Address {
            let project = Address::unique();
            self.program
                .airdrop(project, Amount::from_nos(nos))
                .expect("airdrop");
            project
        }

        fn node(&mut self) -> (Address, NodeCredentials) {
            let node = Address::unique();
            self.program
                .airdrop(node, Amount::from_nos(100))
                .expect("airdrop");
            let stake = self
                .program
                .stake(node, Amount::from_nos(100), DURATION_MIN)
                .expect("stake");
            (node, NodeCredentials::stake_only(stake))
        }

        fn placeholder(&self) -> Address {
            self.program
                .market_ref(&self.market)
                .map(|m| m.placeholder)
                .expect("market")
        }

        fn vault(&self) -> Amount {
            self.program.vault_balance(&self.market).expect("vault")
        }

        /// Lists a job and matches it with a fresh node.
        fn running_job(&mut self) -> (Address, Address, NodeCredentials, Address) {
            let project = self.project(10);
            let (node, credentials) = self.node();
            self.program
                .list(project, self.market, JobSlot::Placeholder, ContentRef::from_content(b"spec"))
                .expect("list");
            let job = Address::unique();
            self.program
                .work(node, self.market, JobSlot::Fresh(job), &credentials)
                .expect("work");
            (job, node, credentials, project)
        }
    }

    #[test]
    fn open_rejects_used_keys() {
        let mut h = Harness::new(MarketConfig::default());
        let placeholder = h.placeholder();
        assert_eq!(
            h.program
                .open(h.authority, h.market, Address::unique(), MarketConfig::default()),
            Err(JobsError::AccountInUse(h.market))
        );
        assert_eq!(
            h.program
                .open(h.authority, Address::unique(), placeholder, MarketConfig::default()),
            Err(JobsError::AccountInUse(placeholder))
        );
    }

    #[test]
    fn list_escrows_price_and_charges_fee() {
        let mut h = Harness::new(MarketConfig::default());
        let project = h.project(10);

        let outcome = h
            .program
            .list(project, h.market, JobSlot::Placeholder, ContentRef::from_content(b"spec"))
            .expect("list");

        assert_eq!(
            outcome,
            Outcome::JobQueued {
                market: h.market,
                position: 1
            }
        );
        assert_eq!(h.vault(), Amount::from_nos(1));
        let fee_collector = h.program.state().config.fee_collector;
        assert_eq!(
            h.program.state().ledger.balance(&fee_collector),
            Amount::from_units(100_000)
        );
        assert_eq!(
            h.program
                .state()
                .ledger
                .balance(&h.program.token_account(&project)),
            Amount::from_units(8_900_000)
        );
    }

    #[test]
    fn list_without_funds_leaves_no_trace() {
        let mut h = Harness::new(MarketConfig::default());
        let project = h.project(1);
        let before = h.program.state().clone();

        let result = h.program.list(
            project,
            h.market,
            JobSlot::Placeholder,
            ContentRef::from_content(b"spec"),
        );

        assert!(matches!(result, Err(JobsError::Ledger(_))));
        assert_eq!(h.program.state(), &before);
    }

    #[test]
    fn work_matches_queued_job_at_escrowed_price() {
        let mut h = Harness::new(MarketConfig::default());
        let project = h.project(10);
        h.program
            .list(project, h.market, JobSlot::Placeholder, ContentRef::from_content(b"spec"))
            .expect("list");
        h.program
            .update(
                h.authority,
                h.market,
                MarketConfig {
                    job_price: Amount::from_nos(5),
                    ..MarketConfig::default()
                },
            )
            .expect("update");

        let (node, credentials) = h.node();
        let job = Address::unique();
        h.program
            .work(node, h.market, JobSlot::Fresh(job), &credentials)
            .expect("work");

        let record = h.program.job_ref(&job).expect("job");
        assert_eq!(record.status, JobStatus::Running);
        assert_eq!(record.node, node);
        assert_eq!(record.project, project);
        assert_eq!(record.price, Amount::from_nos(1));
        assert_eq!(record.time_start, START);
        assert!(h.program.market_ref(&h.market).expect("market").queue.is_empty());
    }

    #[test]
    fn work_with_placeholder_cannot_match() {
        let mut h = Harness::new(MarketConfig::default());
        let project = h.project(10);
        h.program
            .list(project, h.market, JobSlot::Placeholder, ContentRef::from_content(b"spec"))
            .expect("list");
        let (node, credentials) = h.node();
        let placeholder = h.placeholder();

        for slot in [JobSlot::Placeholder, JobSlot::Fresh(placeholder)] {
            assert_eq!(
                h.program.work(node, h.market, slot, &credentials),
                Err(JobsError::JobConstraintNotSatisfied)
            );
        }
    }

    #[test]
    fn job_keys_are_never_reused() {
        let mut h = Harness::new(MarketConfig::default());
        let (job, _, _, _) = h.running_job();

        let project = h.project(10);
        h.program
            .list(project, h.market, JobSlot::Placeholder, ContentRef::from_content(b"again"))
            .expect("list");
        let (node, credentials) = h.node();
        assert_eq!(
            h.program
                .work(node, h.market, JobSlot::Fresh(job), &credentials),
            Err(JobsError::JobConstraintNotSatisfied)
        );
        assert_eq!(
            h.program
                .work(node, h.market, JobSlot::Fresh(h.market), &credentials),
            Err(JobsError::JobConstraintNotSatisfied)
        );
    }

    #[test]
    fn node_cannot_queue_twice() {
        let mut h = Harness::new(MarketConfig::default());
        let (node, credentials) = h.node();
        h.program
            .work(node, h.market, JobSlot::Placeholder, &credentials)
            .expect("work");
        assert_eq!(
            h.program
                .work(node, h.market, JobSlot::Placeholder, &credentials),
            Err(JobsError::NodeAlreadyQueued)
        );
    }

    #[test]
    fn list_matches_waiting_node() {
        let mut h = Harness::new(MarketConfig::default());
        let (node, credentials) = h.node();
        h.program
            .work(node, h.market, JobSlot::Placeholder, &credentials)
            .expect("work");

        let project = h.project(10);
        assert_eq!(
            h.program.list(
                project,
                h.market,
                JobSlot::Placeholder,
                ContentRef::from_content(b"spec")
            ),
            Err(JobsError::JobConstraintNotSatisfied)
        );

        let job = Address::unique();
        let outcome = h
            .program
            .list(project, h.market, JobSlot::Fresh(job), ContentRef::from_content(b"spec"))
            .expect("list");
        assert_eq!(
            outcome,
            Outcome::JobMatched {
                job,
                node,
                project,
                price: Amount::from_nos(1)
            }
        );
        assert_eq!(h.vault(), Amount::from_nos(1));
    }

    #[test]
    fn finish_pays_node() {
        let mut h = Harness::new(MarketConfig::default());
        let (job, node, _, _) = h.running_job();
        h.clock.advance(30);

        let result = ContentRef::from_content(b"result");
        h.program.finish(node, job, result).expect("finish");

        let record = h.program.job_ref(&job).expect("job");
        assert_eq!(record.status, JobStatus::Done);
        assert_eq!(record.payload, result);
        assert_eq!(record.time_end, START + 30);
        assert_eq!(h.vault(), Amount::ZERO);
        assert_eq!(
            h.program
                .state()
                .ledger
                .balance(&h.program.token_account(&node)),
            Amount::from_nos(1)
        );
    }

    #[test]
    fn finish_requires_node_and_running() {
        let mut h = Harness::new(MarketConfig::default());
        let (job, node, _, project) = h.running_job();
        let result = ContentRef::from_content(b"result");

        assert_eq!(h.program.finish(project, job, result), Err(JobsError::Unauthorized));
        h.program.finish(node, job, result).expect("finish");
        assert_eq!(h.program.finish(node, job, result), Err(JobsError::JobInWrongState));
    }

    #[test]
    fn quit_then_claim_preserves_start() {
        let mut h = Harness::new(MarketConfig::default());
        let (job, node, _, _) = h.running_job();
        h.clock.advance(10);
        h.program.quit(node, job).expect("quit");
        assert_eq!(h.vault(), Amount::from_nos(1));

        let (other, credentials) = h.node();
        let nft = h.program.mint_nft(other, "Nosana Node", None).expect("nft");
        let credentials = credentials.with_nft(nft.account, nft.metadata);
        h.program.claim(other, job, &credentials).expect("claim");

        let record = h.program.job_ref(&job).expect("job");
        assert_eq!(record.status, JobStatus::Running);
        assert_eq!(record.node, other);
        assert_eq!(record.time_start, START);
    }

    #[test]
    fn claim_requires_quit() {
        let mut h = Harness::new(MarketConfig::default());
        let (job, node, credentials, _) = h.running_job();
        assert_eq!(
            h.program.claim(node, job, &credentials),
            Err(JobsError::JobInWrongState)
        );
    }

    #[test]
    fn quit_requires_assigned_node() {
        let mut h = Harness::new(MarketConfig::default());
        let (job, _, _, project) = h.running_job();
        assert_eq!(h.program.quit(project, job), Err(JobsError::Unauthorized));
    }

    #[test_case(-1, Err(JobsError::JobNotExpired) ; "one second early")]
    #[test_case(0, Ok(()) ; "at the boundary")]
    fn clean_respects_expiration(offset: i64, expected: Result<(), JobsError>) {
        let expiration = 100;
        let mut h = Harness::new(MarketConfig {
            job_expiration: expiration,
            ..MarketConfig::default()
        });
        let (job, node, _, _) = h.running_job();
        h.program
            .finish(node, job, ContentRef::from_content(b"result"))
            .expect("finish");

        h.clock.advance(expiration + offset);
        let result = h.program.clean(Address::unique(), job).map(|_| ());
        assert_eq!(result, expected);
        assert_eq!(h.program.job_ref(&job).is_ok(), expected.is_err());
    }

    #[test]
    fn clean_requires_done() {
        let mut h = Harness::new(MarketConfig::default());
        let (job, _, _, _) = h.running_job();
        h.clock.advance(1_000_000);
        assert_eq!(
            h.program.clean(Address::unique(), job),
            Err(JobsError::JobInWrongState)
        );
    }

    #[test]
    fn recover_refunds_project() {
        let mut h = Harness::new(MarketConfig::default());
        let (job, node, _, project) = h.running_job();
        let account = h.program.token_account(&project);
        let before = h.program.state().ledger.balance(&account);

        assert_eq!(h.program.recover(project, job), Err(JobsError::JobInWrongState));
        h.program.quit(node, job).expect("quit");
        assert_eq!(h.program.recover(node, job), Err(JobsError::Unauthorized));

        h.program.recover(project, job).expect("recover");
        assert_eq!(
            h.program.state().ledger.balance(&account),
            before.checked_add(Amount::from_nos(1)).expect("sum")
        );
        assert_eq!(h.vault(), Amount::ZERO);
        assert_eq!(h.program.job_ref(&job), Err(JobsError::JobNotFound(job)));
    }

    #[test]
    fn update_and_close_require_authority() {
        let mut h = Harness::new(MarketConfig::default());
        let stranger = Address::unique();
        assert_eq!(
            h.program
                .update(stranger, h.market, MarketConfig::default()),
            Err(JobsError::Unauthorized)
        );
        assert_eq!(h.program.close(stranger, h.market), Err(JobsError::Unauthorized));
    }

    #[test]
    fn close_requires_empty_vault_and_queue() {
        let mut h = Harness::new(MarketConfig::default());
        let project = h.project(10);
        h.program
            .list(project, h.market, JobSlot::Placeholder, ContentRef::from_content(b"spec"))
            .expect("list");
        assert_eq!(h.program.close(h.authority, h.market), Err(JobsError::VaultNotEmpty));

        let mut h = Harness::new(MarketConfig::default());
        let (node, credentials) = h.node();
        h.program
            .work(node, h.market, JobSlot::Placeholder, &credentials)
            .expect("work");
        assert_eq!(h.program.close(h.authority, h.market), Err(JobsError::QueueNotEmpty));
    }

    #[test]
    fn close_removes_market_and_retires_key() {
        let mut h = Harness::new(MarketConfig::default());
        let vault = h.program.market_ref(&h.market).expect("market").vault;
        h.program.close(h.authority, h.market).expect("close");

        assert_eq!(
            h.program.market_ref(&h.market),
            Err(JobsError::MarketNotFound(h.market))
        );
        assert!(h.program.state().ledger.account(&vault).is_none());
        assert_eq!(
            h.program
                .open(h.authority, h.market, Address::unique(), MarketConfig::default()),
            Err(JobsError::AccountInUse(h.market))
        );
    }

    #[test]
    fn orphaned_done_job_cleans_immediately() {
        let mut h = Harness::new(MarketConfig {
            job_expiration: 1_000,
            ..MarketConfig::default()
        });
        let (job, node, _, _) = h.running_job();
        h.program
            .finish(node, job, ContentRef::from_content(b"result"))
            .expect("finish");
        h.program.close(h.authority, h.market).expect("close");

        assert!(h.program.clean(Address::unique(), job).is_ok());
    }

    #[test]
    fn work_requires_stake_minimum() {
        let mut h = Harness::new(MarketConfig {
            node_stake_minimum: Amount::from_nos(1_000),
            ..MarketConfig::default()
        });
        let (node, credentials) = h.node();
        assert_eq!(
            h.program
                .work(node, h.market, JobSlot::Placeholder, &credentials),
            Err(JobsError::NodeNotEnoughStake)
        );
        assert_eq!(
            credentials.stake,
            stake_address(&node, &h.program.state().config.mint)
        );
    }

    /// Escrow held by waiting jobs plus unsettled live jobs.
    fn expected_escrow(program: &JobsProgram, market: &Address) -> Amount {
        let queued = program
            .market_ref(market)
            .map(|m| m.queue.escrowed())
            .unwrap_or(Amount::ZERO);
        program
            .state()
            .jobs
            .values()
            .filter(|job| job.market == *market && !job.status.is_settled())
            .fold(queued, |total, job| total.checked_add(job.price).unwrap_or(Amount::MAX))
    }

    #[derive(Debug, Clone)]
    enum Op {
        List(u8),
        Work(u8),
        Finish(u8),
        Quit(u8),
        Recover(u8),
        Reprice(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<u8>().prop_map(Op::List),
            any::<u8>().prop_map(Op::Work),
            any::<u8>().prop_map(Op::Finish),
            any::<u8>().prop_map(Op::Quit),
            any::<u8>().prop_map(Op::Recover),
            (1u8..10).prop_map(Op::Reprice),
        ]
    }

    proptest! {
        #[test]
        fn vault_always_matches_unsettled_escrow(ops in proptest::collection::vec(op(), 1..40)) {
            let mut h = Harness::new(MarketConfig::default());
            let projects: Vec<Address> = (0..3).map(|_| h.project(50)).collect();
            let nodes: Vec<(Address, NodeCredentials)> = (0..3).map(|_| h.node()).collect();

            for op in ops {
                let job_keys: Vec<Address> = h.program.state().jobs.keys().copied().collect();
                let pick_job = |i: u8| job_keys.get(usize::from(i) % job_keys.len().max(1)).copied();
                match op {
                    Op::List(i) => {
                        let project = projects[usize::from(i) % projects.len()];
                        let _ = h.program.list(
                            project,
                            h.market,
                            JobSlot::Fresh(Address::unique()),
                            ContentRef::from_content(&[i]),
                        );
                    }
                    Op::Work(i) => {
                        let (node, credentials) = nodes[usize::from(i) % nodes.len()];
                        let _ = h.program.work(node, h.market, JobSlot::Fresh(Address::unique()), &credentials);
                    }
                    Op::Finish(i) => {
                        if let Some(job) = pick_job(i) {
                            let node = h.program.job_ref(&job).map(|j| j.node).unwrap_or_default();
                            let _ = h.program.finish(node, job, ContentRef::from_content(b"out"));
                        }
                    }
                    Op::Quit(i) => {
                        if let Some(job) = pick_job(i) {
                            let node = h.program.job_ref(&job).map(|j| j.node).unwrap_or_default();
                            let _ = h.program.quit(node, job);
                        }
                    }
                    Op::Recover(i) => {
                        if let Some(job) = pick_job(i) {
                            let project = h.program.job_ref(&job).map(|j| j.project).unwrap_or_default();
                            let _ = h.program.recover(project, job);
                        }
                    }
                    Op::Reprice(n) => {
                        let _ = h.program.update(h.authority, h.market, MarketConfig {
                            job_price: Amount::from_nos(u64::from(n)),
                            ..MarketConfig::default()
                        });
                    }
                }

                prop_assert_eq!(h.vault(), expected_escrow(&h.program, &h.market));
                let queue = &h.program.market_ref(&h.market).expect("market").queue;
                prop_assert_eq!(queue.is_empty(), queue.len() == 0);
            }
        }
    }
}
