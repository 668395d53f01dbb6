use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use std::sync::{Arc, OnceLock};

use crate::error::{UserError, UserResult};

/// Argon2id password hashing.
///
/// Hashes are PHC strings, so the salt and cost parameters travel with the
/// hash and `verify` works across cost changes.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    /// Hash of a throwaway secret at this cost, made on first use
    pub(crate) decoy: Arc<OnceLock<String>>,
}

impl CredentialHasher {
    pub const DEFAULT_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;
    pub const DEFAULT_ITERATIONS: u32 = Params::DEFAULT_T_COST;
    pub const DEFAULT_PARALLELISM: u32 = Params::DEFAULT_P_COST;

    /// Argon2id with the crate's recommended costs
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
            decoy: Arc::default(),
        }
    }

    /// Custom cost: memory in KiB, iterations, lanes
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> UserResult<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| UserError::Hashing(format!("invalid hasher parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            decoy: Arc::default(),
        })
    }

    pub fn hash(&self, plaintext: &str) -> UserResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| UserError::Hashing(e.to_string()))
    }

    /// `Ok(false)` on mismatch; an unreadable stored hash is an error.
    pub fn verify(&self, hashed: &str, plaintext: &str) -> UserResult<bool> {
        let parsed = PasswordHash::new(hashed).map_err(|e| UserError::Hashing(e.to_string()))?;

        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(UserError::Hashing(e.to_string())),
        }
    }

    /// Does the work of a `verify` when there is no stored hash to check,
    /// so a missing account costs as much as a wrong password.
    pub fn verify_decoy(&self, plaintext: &str) -> UserResult<()> {
        let decoy = match self.decoy.get() {
            Some(decoy) => decoy,
            None => {
                let fresh = self.hash("decoy-credential")?;
                self.decoy.get_or_init(|| fresh)
            }
        };

        self.verify(decoy, plaintext).map(|_| ())
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}
