//! A CLI session: the program resumed from the state directory plus the
//! local keyring.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use nos_core::{Address, Clock, ContentRef, Keypair, ManualClock, SystemClock};
use nos_jobs::{Instruction, JobSlot, JobsProgram, NodeCredentials, Outcome, ProgramConfig, ProgramState};
use nos_token::{metadata_address, stake_address};
use tracing::{debug, info, warn};

use crate::cli::SlotArgs;
use crate::error::CliError;
use crate::persist::JsonStore;

/// Named secret keys, base58 encoded.
type Keyring = BTreeMap<String, String>;

/// Program state and keys loaded from one state directory.
#[derive(Debug)]
pub struct Session {
    state_store: JsonStore,
    keyring_store: JsonStore,
    keyring: Keyring,
    program: JobsProgram,
}

impl Session {
    /// Loads the session stored in `dir`.
    ///
    /// A missing snapshot starts a fresh world from `config.json`, or from the
    /// default program config if that is missing too. With `now` set the
    /// clock is pinned to that unix time.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be read or parsed.
    pub fn open(dir: &Path, now: Option<i64>) -> Result<Self, CliError> {
        let state_store = JsonStore::new(dir, "state");
        let keyring_store = JsonStore::new(dir, "keyring");

        let state = match state_store.load::<ProgramState>()? {
            Some(state) => state,
            None => {
                let config: ProgramConfig = JsonStore::new(dir, "config").load()?.unwrap_or_default();
                debug!(dir = %dir.display(), "starting fresh state");
                ProgramState::new(config)
            }
        };
        let keyring = keyring_store.load()?.unwrap_or_default();

        let clock: Arc<dyn Clock> = match now {
            Some(now) => Arc::new(ManualClock::new(now)),
            None => Arc::new(SystemClock),
        };

        Ok(Self {
            state_store,
            keyring_store,
            keyring,
            program: JobsProgram::from_state(state, clock),
        })
    }

    /// The program.
    #[must_use]
    pub const fn program(&self) -> &JobsProgram {
        &self.program
    }

    /// The program, for world setup operations.
    pub fn program_mut(&mut self) -> &mut JobsProgram {
        &mut self.program
    }

    /// Generates and stores a new key.
    ///
    /// # Errors
    ///
    /// Returns `CliError::KeyExists` if the name is taken.
    pub fn keygen(&mut self, name: &str) -> Result<Address, CliError> {
        if self.keyring.contains_key(name) {
            return Err(CliError::KeyExists(name.to_string()));
        }
        let keypair = Keypair::generate();
        let address = keypair.address();
        self.keyring
            .insert(name.to_string(), bs58::encode(keypair.secret_bytes()).into_string());
        info!(name, address = %address, "key created");
        Ok(address)
    }

    /// The keypair stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such key or it is malformed.
    pub fn keypair(&self, name: &str) -> Result<Keypair, CliError> {
        let encoded = self
            .keyring
            .get(name)
            .ok_or_else(|| CliError::UnknownKey(name.to_string()))?;
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| CliError::Config(format!("key {name}: {e}")))?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CliError::Config(format!("key {name}: secret must be 32 bytes")))?;
        Ok(Keypair::from_secret_bytes(&secret))
    }

    /// Resolves a key name, or failing that a base58 address.
    ///
    /// # Errors
    ///
    /// Returns `CliError::UnknownKey` if `name` is neither.
    pub fn resolve(&self, name: &str) -> Result<Address, CliError> {
        if self.keyring.contains_key(name) {
            return Ok(self.keypair(name)?.address());
        }
        name.parse()
            .map_err(|_| CliError::UnknownKey(name.to_string()))
    }

    /// Signs `instruction` with the key `signer` and runs it. The snapshot is
    /// only written when the instruction commits.
    ///
    /// # Errors
    ///
    /// Returns the program's rejection, or an error writing the snapshot.
    pub fn submit(&mut self, signer: &str, instruction: Instruction) -> Result<Outcome, CliError> {
        let keypair = self.keypair(signer)?;
        let signed = instruction.sign(&keypair)?;
        let outcome = self.program.process_signed(signed)?;
        if let Err(e) = self.save() {
            warn!(error = %e, "committed instruction not persisted");
            return Err(e);
        }
        Ok(outcome)
    }

    /// Credentials for `node`: its stake account and, if given, the NFT
    /// token account with the metadata of that NFT's mint.
    #[must_use]
    pub fn credentials(&self, node: &Address, nft: Option<Address>) -> NodeCredentials {
        let state = self.program.state();
        let creds = NodeCredentials::stake_only(stake_address(node, &state.config.mint));
        match nft {
            Some(nft) => {
                let metadata = state
                    .ledger
                    .account(&nft)
                    .map_or(Address::SYSTEM, |account| metadata_address(&account.mint));
                creds.with_nft(nft, metadata)
            }
            None => creds,
        }
    }

    /// Writes the program state and keyring back to the state directory.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn save(&self) -> Result<(), CliError> {
        self.state_store.save(self.program.state())?;
        self.keyring_store.save(&self.keyring)
    }
}

/// Reads a content reference: 64 hex characters are taken as-is, anything
/// else names a file whose contents are hashed.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn parse_content(value: &str) -> Result<ContentRef, CliError> {
    if let Ok(content) = value.parse() {
        return Ok(content);
    }
    let bytes = fs::read(value)
        .map_err(|e| CliError::InvalidArgument(format!("{value}: {e}")))?;
    Ok(ContentRef::from_content(&bytes))
}

impl From<&SlotArgs> for JobSlot {
    fn from(args: &SlotArgs) -> Self {
        match args.job {
            Some(key) => Self::Fresh(key),
            None if args.new_job => Self::Fresh(Address::unique()),
            None => Self::Placeholder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nos_core::Amount;

    fn session(dir: &Path) -> Session {
        Session::open(dir, Some(1_000)).expect("open")
    }

    #[test]
    fn fresh_directory_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session(dir.path());
        assert!(session.program().markets().is_empty());
        assert_eq!(session.program().now(), 1_000);
    }

    #[test]
    fn keygen_rejects_duplicates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session(dir.path());
        let address = session.keygen("alice").expect("keygen");
        assert_eq!(session.resolve("alice").expect("resolve"), address);
        assert!(matches!(session.keygen("alice"), Err(CliError::KeyExists(_))));
    }

    #[test]
    fn resolve_accepts_addresses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let session = session(dir.path());
        let address = Address::new([5u8; 32]);
        assert_eq!(session.resolve(&address.to_string()).expect("resolve"), address);
        assert!(matches!(session.resolve("nobody"), Err(CliError::UnknownKey(_))));
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let alice = {
            let mut session = session(dir.path());
            let alice = session.keygen("alice").expect("keygen");
            session
                .program_mut()
                .airdrop(alice, Amount::from_nos(5))
                .expect("airdrop");
            session.save().expect("save");
            alice
        };

        let session = session(dir.path());
        let account = session.program().token_account(&alice);
        assert_eq!(session.program().state().ledger.balance(&account), Amount::from_nos(5));
        assert_eq!(session.keypair("alice").expect("key").address(), alice);
    }

    #[test]
    fn rejected_instruction_is_not_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session(dir.path());
        session.keygen("alice").expect("keygen");
        let result = session.submit(
            "alice",
            Instruction::Close {
                market: Address::new([7u8; 32]),
            },
        );
        assert!(matches!(result, Err(CliError::Program(_))));
        assert!(!dir.path().join("state.json").exists());
    }

    #[test]
    fn credentials_derive_metadata_from_nft() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session(dir.path());
        let node = session.keygen("node").expect("keygen");
        let nft = session
            .program_mut()
            .mint_nft(node, "access", None)
            .expect("nft");

        let creds = session.credentials(&node, Some(nft.account));
        assert_eq!(creds.nft, Some(nft.account));
        assert_eq!(creds.metadata, Some(nft.metadata));
        assert!(session.credentials(&node, None).nft.is_none());
    }

    #[test]
    fn content_accepts_hex_or_file() {
        let reference = ContentRef::from_content(b"job");
        assert_eq!(parse_content(&reference.to_string()).expect("hex"), reference);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("job.json");
        fs::write(&path, b"job").expect("write");
        assert_eq!(
            parse_content(path.to_str().expect("utf-8 path")).expect("file"),
            reference
        );
        assert!(parse_content("/does/not/exist").is_err());
    }

    #[test]
    fn slot_args_choose_slot() {
        let key = Address::new([8u8; 32]);
        assert_eq!(JobSlot::from(&SlotArgs::default()), JobSlot::Placeholder);
        assert_eq!(
            JobSlot::from(&SlotArgs {
                job: Some(key),
                new_job: false
            }),
            JobSlot::Fresh(key)
        );
        assert!(matches!(
            JobSlot::from(&SlotArgs {
                job: None,
                new_job: true
            }),
            JobSlot::Fresh(_)
        ));
    }
}
