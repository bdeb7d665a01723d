use std::sync::Arc;

use rand::Rng;
use rand::distr::{Alphanumeric, SampleString};
use tracing::{debug, info, warn};
use uuid::Uuid;
use voucher_db::StoreError;
use voucher_db::models::{CodeType, VoucherCode};
use voucher_db::VoucherStore;

use crate::config::CodeConfig;
use crate::error::VoucherError;

/// No 0/O or 1/I, codes get read out loud and typed from paper.
const READABLE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const WIDE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const QR_TOKEN_LEN: usize = 16;
const QR_TOKEN_LEN_WIDE: usize = 24;
const STATIC_PREFIX: &str = "VCH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeWidth {
    Standard,
    /// Larger space used once the standard draws keep colliding.
    Widened,
}

/// Produces candidate code strings. Uniqueness is the store's business.
pub trait CodeSource: Send + Sync {
    fn draw(&self, code_type: CodeType, width: CodeWidth) -> String;
}

#[derive(Debug, Clone)]
pub struct RandomCodeSource {
    short_length: usize,
    qr_base_url: String,
}

impl RandomCodeSource {
    pub fn new(short_length: usize, qr_base_url: &str) -> Self {
        Self {
            short_length: short_length.clamp(6, 16),
            qr_base_url: qr_base_url.trim_end_matches('/').to_string(),
        }
    }
}

fn pick(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

impl CodeSource for RandomCodeSource {
    fn draw(&self, code_type: CodeType, width: CodeWidth) -> String {
        match (code_type, width) {
            (CodeType::Short, CodeWidth::Standard) => pick(READABLE_ALPHABET, self.short_length),
            (CodeType::Short, CodeWidth::Widened) => pick(WIDE_ALPHABET, self.short_length + 2),
            (CodeType::Qr, width) => {
                let len = match width {
                    CodeWidth::Standard => QR_TOKEN_LEN,
                    CodeWidth::Widened => QR_TOKEN_LEN_WIDE,
                };
                let token = Alphanumeric.sample_string(&mut rand::rng(), len);
                format!("{}/r/{}", self.qr_base_url, token)
            }
            (CodeType::Static, CodeWidth::Standard) => format!(
                "{}-{}-{}",
                STATIC_PREFIX,
                pick(READABLE_ALPHABET, 4),
                pick(READABLE_ALPHABET, 4)
            ),
            (CodeType::Static, CodeWidth::Widened) => format!(
                "{}-{}-{}-{}",
                STATIC_PREFIX,
                pick(WIDE_ALPHABET, 4),
                pick(WIDE_ALPHABET, 4),
                pick(WIDE_ALPHABET, 4)
            ),
        }
    }
}

pub struct CodeIssuer {
    store: Arc<dyn VoucherStore>,
    source: Arc<dyn CodeSource>,
    max_attempts: u32,
}

impl CodeIssuer {
    pub fn new(store: Arc<dyn VoucherStore>, source: Arc<dyn CodeSource>, max_attempts: u32) -> Self {
        Self {
            store,
            source,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(store: Arc<dyn VoucherStore>, config: &CodeConfig) -> Self {
        let source = RandomCodeSource::new(config.short_length, &config.qr_base_url);
        Self::new(store, Arc::new(source), config.max_attempts)
    }

    /// Issues one code per requested type, duplicates in `types` ignored.
    pub async fn issue(
        &self,
        voucher_id: Uuid,
        types: &[CodeType],
    ) -> Result<Vec<VoucherCode>, VoucherError> {
        let mut issued = Vec::with_capacity(types.len());
        let mut seen = Vec::with_capacity(types.len());
        for &code_type in types {
            if seen.contains(&code_type) {
                continue;
            }
            seen.push(code_type);
            issued.push(self.issue_one(voucher_id, code_type).await?);
        }
        Ok(issued)
    }

    async fn issue_one(
        &self,
        voucher_id: Uuid,
        code_type: CodeType,
    ) -> Result<VoucherCode, VoucherError> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.source.draw(code_type, CodeWidth::Standard);
            match self.store.insert_code(voucher_id, &candidate, code_type).await {
                Ok(code) => {
                    info!(%voucher_id, %code_type, attempt, "Issued voucher code");
                    return Ok(code);
                }
                Err(StoreError::UniqueViolation { .. }) => {
                    debug!(%voucher_id, %code_type, attempt, "Code collision, drawing again");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            %voucher_id,
            %code_type,
            attempts = self.max_attempts,
            "Standard code space kept colliding, widening"
        );
        let candidate = self.source.draw(code_type, CodeWidth::Widened);
        match self.store.insert_code(voucher_id, &candidate, code_type).await {
            Ok(code) => {
                info!(%voucher_id, %code_type, "Issued widened voucher code");
                Ok(code)
            }
            Err(StoreError::UniqueViolation { .. }) => Err(VoucherError::CodeGenerationExhausted {
                code_type,
                attempts: self.max_attempts + 1,
            }),
            Err(e) => Err(e.into()),
        }
    }
}
