//! Ledger Service
//!
//! DDT 스마트 컨트랙트(Base 네트워크) 쓰기 래퍼.
//!
//! # Contract Functions
//!
//! - `approveFilmAndMintDDTs(uint256 filmId)`
//! - `assignDDTToDistributor(uint256 filmId, uint256 distributorId)`
//! - `recordSaleAndDistributeRevenue(uint256 filmId, uint256 distributorId, uint256 saleAmount)`
//!
//! 모든 호출은 receipt를 기다린 뒤 트랜잭션 해시를 반환한다.
//! 재시도는 호출자(side-effect worker)의 책임.

use std::sync::Arc;

use async_trait::async_trait;
use ethers::{
    abi::{parse_abi, Tokenize},
    contract::Contract,
    middleware::SignerMiddleware,
    providers::{Http, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, U256, U64},
};
use thiserror::Error;

use crate::config::ChainConfig;
use crate::types::UsdAmount;

/// 컨트랙트 ABI (human-readable)
const DDT_CONTRACT_ABI: &[&str] = &[
    "function approveFilmAndMintDDTs(uint256 _filmId)",
    "function assignDDTToDistributor(uint256 _filmId, uint256 _distributorId)",
    "function recordSaleAndDistributeRevenue(uint256 _filmId, uint256 _distributorId, uint256 _saleAmount)",
];

/// micro-USD -> wei (18 decimals)
const WEI_PER_MICRO_USD: u32 = 12;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger not configured: {0}")]
    NotConfigured(String),

    #[error("invalid ledger argument: {0}")]
    InvalidArgument(String),

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("transaction dropped from mempool")]
    Dropped,
}

impl LedgerError {
    /// 재시도해도 결과가 같은 에러
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            LedgerError::NotConfigured(_) | LedgerError::InvalidArgument(_)
        )
    }
}

/// 온체인 기록 인터페이스
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn approve_film(&self, film_id: i64) -> Result<String, LedgerError>;

    async fn assign_ddt(&self, film_id: i64, distributor_id: i64) -> Result<String, LedgerError>;

    async fn record_sale(
        &self,
        film_id: i64,
        distributor_id: i64,
        amount: UsdAmount,
    ) -> Result<String, LedgerError>;
}

/// 설정에 따라 ledger 구현 선택
pub fn build_ledger(config: &ChainConfig) -> Arc<dyn LedgerClient> {
    match EthersLedger::new(config) {
        Ok(ledger) => {
            tracing::info!(chain_id = config.chain_id, "DDT ledger connected");
            Arc::new(ledger)
        }
        Err(e) => {
            tracing::warn!(error = %e, "on-chain mirroring disabled");
            Arc::new(UnconfiguredLedger {
                reason: e.to_string(),
            })
        }
    }
}

type SignedClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// ethers 기반 구현 (플랫폼 키로 서명)
pub struct EthersLedger {
    contract: Contract<SignedClient>,
}

impl EthersLedger {
    pub fn new(config: &ChainConfig) -> Result<Self, LedgerError> {
        let private_key = config
            .private_key
            .as_deref()
            .ok_or_else(|| LedgerError::NotConfigured("PLATFORM_PRIVATE_KEY not set".into()))?;
        let contract_address = config
            .contract_address
            .as_deref()
            .ok_or_else(|| LedgerError::NotConfigured("DDT_CONTRACT_ADDRESS not set".into()))?;

        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| LedgerError::NotConfigured(format!("invalid RPC url: {}", e)))?;
        let wallet = private_key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| LedgerError::NotConfigured(format!("invalid private key: {}", e)))?
            .with_chain_id(config.chain_id);
        let address: Address = contract_address
            .parse()
            .map_err(|_| LedgerError::NotConfigured("invalid contract address".into()))?;
        let abi = parse_abi(DDT_CONTRACT_ABI)
            .map_err(|e| LedgerError::NotConfigured(format!("invalid ABI: {}", e)))?;

        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        Ok(Self {
            contract: Contract::new(address, abi, client),
        })
    }

    async fn send<T: Tokenize + Send>(&self, function: &str, args: T) -> Result<String, LedgerError> {
        let call = self
            .contract
            .method::<_, ()>(function, args)
            .map_err(|e| LedgerError::InvalidArgument(e.to_string()))?;

        let pending = call
            .send()
            .await
            .map_err(|e| LedgerError::Transaction(e.to_string()))?;
        let tx_hash = format!("{:?}", pending.tx_hash());
        tracing::debug!(function, %tx_hash, "transaction submitted, waiting for receipt");

        let receipt = pending
            .await
            .map_err(|e| LedgerError::Transaction(e.to_string()))?
            .ok_or(LedgerError::Dropped)?;

        if receipt.status != Some(U64::from(1)) {
            return Err(LedgerError::Reverted(tx_hash));
        }

        Ok(format!("{:?}", receipt.transaction_hash))
    }
}

#[async_trait]
impl LedgerClient for EthersLedger {
    async fn approve_film(&self, film_id: i64) -> Result<String, LedgerError> {
        let film_id = to_uint(film_id)?;
        self.send("approveFilmAndMintDDTs", film_id).await
    }

    async fn assign_ddt(&self, film_id: i64, distributor_id: i64) -> Result<String, LedgerError> {
        let args = (to_uint(film_id)?, to_uint(distributor_id)?);
        self.send("assignDDTToDistributor", args).await
    }

    async fn record_sale(
        &self,
        film_id: i64,
        distributor_id: i64,
        amount: UsdAmount,
    ) -> Result<String, LedgerError> {
        let args = (to_uint(film_id)?, to_uint(distributor_id)?, usd_to_wei(amount)?);
        self.send("recordSaleAndDistributeRevenue", args).await
    }
}

/// 키/주소가 없을 때 사용. 모든 호출이 영구 실패
pub struct UnconfiguredLedger {
    reason: String,
}

#[async_trait]
impl LedgerClient for UnconfiguredLedger {
    async fn approve_film(&self, _film_id: i64) -> Result<String, LedgerError> {
        Err(LedgerError::NotConfigured(self.reason.clone()))
    }

    async fn assign_ddt(&self, _film_id: i64, _distributor_id: i64) -> Result<String, LedgerError> {
        Err(LedgerError::NotConfigured(self.reason.clone()))
    }

    async fn record_sale(
        &self,
        _film_id: i64,
        _distributor_id: i64,
        _amount: UsdAmount,
    ) -> Result<String, LedgerError> {
        Err(LedgerError::NotConfigured(self.reason.clone()))
    }
}

fn to_uint(id: i64) -> Result<U256, LedgerError> {
    u64::try_from(id)
        .map(U256::from)
        .map_err(|_| LedgerError::InvalidArgument(format!("negative id {}", id)))
}

/// 판매액을 컨트랙트 단위(wei, 18 decimals)로 변환
pub fn usd_to_wei(amount: UsdAmount) -> Result<U256, LedgerError> {
    let micros = u64::try_from(amount.micros())
        .map_err(|_| LedgerError::InvalidArgument(format!("negative amount {}", amount)))?;
    Ok(U256::from(micros) * U256::exp10(WEI_PER_MICRO_USD as usize))
}
