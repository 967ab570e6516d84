//! Approval Workflow
//!
//! filmmaker / distributor 신청서 접수, 승인, 거절.
//!
//! - filmmaker 승인: 영화 생성 + `approveFilmAndMintDDTs` + 승인 메일
//! - distributor 승인: holding(DDT 1개, referral 링크) 생성 + `assignDDTToDistributor` + 승인 메일
//!
//! 승인은 반복 호출해도 영화/holding을 다시 만들지 않는다.

use thiserror::Error;

use super::mailer::{self, DistributorWelcome};
use super::referral::{create_referral_link, generate_referral_code};
use super::side_effects::{SideEffect, SideEffectQueue};
use crate::db::{
    Application, DistributorHolding, Film, MarketplaceStore, NewApplication, NewFilm, NewHolding,
};
use crate::types::{ApplicationKind, ApplicationStatus, UsdAmount};

/// 신청서에 가격이 없을 때 기본 판매 가격
pub const DEFAULT_FILM_PRICE: UsdAmount = UsdAmount::from_micros(9_990_000);

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// filmmaker 승인 결과
#[derive(Debug, Clone)]
pub struct FilmmakerApproval {
    pub film: Film,
    /// 이번 호출에서 영화가 새로 만들어졌는지
    pub created: bool,
}

/// distributor 승인 결과
#[derive(Debug, Clone)]
pub struct DistributorApproval {
    pub application: Application,
    pub holding: DistributorHolding,
    /// 이번 호출에서 holding이 새로 만들어졌는지
    pub created: bool,
}

pub async fn submit_application(
    store: &dyn MarketplaceStore,
    application: NewApplication,
) -> Result<Application, ApprovalError> {
    validate(&application)?;

    let saved = store.insert_application(&application).await?;
    tracing::info!(
        application_id = saved.id,
        kind = %saved.kind,
        email = %saved.email,
        "application submitted"
    );
    Ok(saved)
}

fn validate(application: &NewApplication) -> Result<(), ApprovalError> {
    if application.first_name.trim().is_empty() || application.last_name.trim().is_empty() {
        return Err(ApprovalError::Invalid("firstName and lastName are required".into()));
    }
    if !application.email.contains('@') {
        return Err(ApprovalError::Invalid("a valid email is required".into()));
    }
    if application.kind == ApplicationKind::Filmmaker
        && application.film_title.as_deref().map_or(true, |t| t.trim().is_empty())
    {
        return Err(ApprovalError::Invalid("filmTitle is required".into()));
    }
    if let Some(price) = application.film_price_usd {
        if !price.is_positive() {
            return Err(ApprovalError::Invalid("filmPriceUsd must be positive".into()));
        }
    }
    Ok(())
}

async fn load_application(
    store: &dyn MarketplaceStore,
    id: i64,
    expected: ApplicationKind,
) -> Result<Application, ApprovalError> {
    let application = store
        .get_application(id)
        .await?
        .ok_or_else(|| ApprovalError::NotFound(format!("Application {} not found", id)))?;

    if application.kind() != Some(expected) {
        return Err(ApprovalError::Invalid(format!(
            "Application {} is not a {} application",
            id,
            expected.as_str()
        )));
    }
    if application.status() == Some(ApplicationStatus::Rejected) {
        return Err(ApprovalError::Invalid(format!("Application {} was rejected", id)));
    }
    Ok(application)
}

async fn mark_approved(store: &dyn MarketplaceStore, id: i64) -> Result<Application, ApprovalError> {
    store
        .set_application_status(id, ApplicationStatus::Approved)
        .await?
        .ok_or_else(|| ApprovalError::NotFound(format!("Application {} not found", id)))
}

/// filmmaker 승인 -> 영화 생성
pub async fn approve_filmmaker(
    store: &dyn MarketplaceStore,
    queue: &SideEffectQueue,
    application_id: i64,
) -> Result<FilmmakerApproval, ApprovalError> {
    load_application(store, application_id, ApplicationKind::Filmmaker).await?;
    let application = mark_approved(store, application_id).await?;

    if let Some(film) = store.find_film_by_application(application_id).await? {
        tracing::info!(application_id, film_id = film.id, "filmmaker already approved");
        return Ok(FilmmakerApproval { film, created: false });
    }

    let title = application
        .film_title
        .clone()
        .unwrap_or_else(|| format!("{}'s film", application.display_name()));
    let film = store
        .insert_film(&NewFilm {
            title,
            price_usd: application.film_price_usd.unwrap_or(DEFAULT_FILM_PRICE),
            filmmaker_application_id: Some(application_id),
        })
        .await?;

    queue.enqueue(SideEffect::ApproveFilm { film_id: film.id }).await;
    queue
        .enqueue(SideEffect::SendEmail {
            message: mailer::filmmaker_approved(&application.email, &film.title),
        })
        .await;

    tracing::info!(application_id, film_id = film.id, title = %film.title, "filmmaker approved");
    Ok(FilmmakerApproval { film, created: true })
}

/// distributor 승인 -> 영화별 holding 생성
pub async fn approve_distributor(
    store: &dyn MarketplaceStore,
    queue: &SideEffectQueue,
    app_url: &str,
    application_id: i64,
    film_id: i64,
) -> Result<DistributorApproval, ApprovalError> {
    load_application(store, application_id, ApplicationKind::Distributor).await?;

    let film = store
        .get_film(film_id)
        .await?
        .ok_or_else(|| ApprovalError::NotFound(format!("Film {} not found", film_id)))?;

    let application = mark_approved(store, application_id).await?;

    // distributor id == application id
    if let Some(holding) = store.find_holding(application_id, film_id).await? {
        tracing::info!(application_id, film_id, "distributor already holds DDT for film");
        return Ok(DistributorApproval {
            application,
            holding,
            created: false,
        });
    }

    let referral_code = generate_referral_code();
    let personalized_link = create_referral_link(app_url, &referral_code, Some(film_id));

    let holding = store
        .insert_holding(&NewHolding {
            distributor_id: application_id,
            film_id,
            referral_code,
            personalized_link,
        })
        .await?;

    queue
        .enqueue(SideEffect::AssignDdt {
            film_id,
            distributor_id: application_id,
        })
        .await;
    queue
        .enqueue(SideEffect::SendEmail {
            message: mailer::distributor_approved(
                &application.email,
                &DistributorWelcome {
                    company_name: application.company_name.as_deref(),
                    personalized_link: &holding.personalized_link,
                    referral_code: &holding.referral_code,
                    film_title: &film.title,
                    trailer_url: film.trailer_url.as_deref(),
                },
            ),
        })
        .await;

    tracing::info!(
        application_id,
        film_id,
        holding_id = holding.id,
        link = %holding.personalized_link,
        "distributor approved"
    );

    Ok(DistributorApproval {
        application,
        holding,
        created: true,
    })
}

/// 거절. 이미 승인된 신청서는 거절할 수 없다
pub async fn reject_application(
    store: &dyn MarketplaceStore,
    queue: &SideEffectQueue,
    application_id: i64,
) -> Result<Application, ApprovalError> {
    let application = store
        .get_application(application_id)
        .await?
        .ok_or_else(|| ApprovalError::NotFound(format!("Application {} not found", application_id)))?;

    match application.status() {
        Some(ApplicationStatus::Rejected) => return Ok(application),
        Some(ApplicationStatus::Approved) => {
            return Err(ApprovalError::Invalid(format!(
                "Application {} is already approved",
                application_id
            )))
        }
        _ => {}
    }

    let application = store
        .set_application_status(application_id, ApplicationStatus::Rejected)
        .await?
        .ok_or_else(|| ApprovalError::NotFound(format!("Application {} not found", application_id)))?;

    let is_filmmaker = application.kind() == Some(ApplicationKind::Filmmaker);
    queue
        .enqueue(SideEffect::SendEmail {
            message: mailer::application_rejected(&application.email, is_filmmaker),
        })
        .await;

    tracing::info!(application_id, "application rejected");
    Ok(application)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::db::memory::MemoryStore;

    fn form(kind: ApplicationKind) -> NewApplication {
        NewApplication {
            kind,
            first_name: "Wanjiru".into(),
            last_name: "Kamau".into(),
            email: "wanjiru@example.com".into(),
            company_name: Some("Nairobi Screens".into()),
            country: Some("Kenya".into()),
            wallet_address: None,
            film_title: (kind == ApplicationKind::Filmmaker).then(|| "Kati Kati".to_string()),
            film_price_usd: None,
            details: serde_json::json!({}),
        }
    }

    fn drain(rx: &mut mpsc::Receiver<SideEffect>) -> Vec<SideEffect> {
        let mut jobs = Vec::new();
        while let Ok(job) = rx.try_recv() {
            jobs.push(job);
        }
        jobs
    }

    #[tokio::test]
    async fn test_filmmaker_approval_creates_film_once() {
        let store = Arc::new(MemoryStore::new());
        let (queue, mut rx) = SideEffectQueue::channel(store.clone(), 16);
        let app = submit_application(store.as_ref(), form(ApplicationKind::Filmmaker))
            .await
            .unwrap();

        let approval = approve_filmmaker(store.as_ref(), &queue, app.id).await.unwrap();
        assert!(approval.created);
        let film = approval.film;
        assert_eq!(film.title, "Kati Kati");
        assert_eq!(film.price_usd, DEFAULT_FILM_PRICE);

        let jobs = drain(&mut rx);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0], SideEffect::ApproveFilm { film_id: film.id });

        let again = approve_filmmaker(store.as_ref(), &queue, app.id).await.unwrap();
        assert!(!again.created);
        assert_eq!(again.film.id, film.id);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_distributor_approval_creates_single_holding() {
        let store = Arc::new(MemoryStore::new());
        let (queue, mut rx) = SideEffectQueue::channel(store.clone(), 16);
        let filmmaker = submit_application(store.as_ref(), form(ApplicationKind::Filmmaker))
            .await
            .unwrap();
        let film = approve_filmmaker(store.as_ref(), &queue, filmmaker.id)
            .await
            .unwrap()
            .film;
        drain(&mut rx);

        let distributor = submit_application(store.as_ref(), form(ApplicationKind::Distributor))
            .await
            .unwrap();
        let approval = approve_distributor(
            store.as_ref(),
            &queue,
            "http://localhost:3000",
            distributor.id,
            film.id,
        )
        .await
        .unwrap();

        assert!(approval.created);
        assert_eq!(approval.holding.ddt_balance, 1);
        assert!(!approval.holding.personalized_link.is_empty());
        assert!(approval
            .holding
            .personalized_link
            .contains(&approval.holding.referral_code));
        assert_eq!(approval.application.status, "approved");

        let jobs = drain(&mut rx);
        assert_eq!(
            jobs[0],
            SideEffect::AssignDdt {
                film_id: film.id,
                distributor_id: distributor.id
            }
        );
        assert!(matches!(jobs[1], SideEffect::SendEmail { .. }));

        // 재승인: holding 그대로, 작업 없음
        let again = approve_distributor(
            store.as_ref(),
            &queue,
            "http://localhost:3000",
            distributor.id,
            film.id,
        )
        .await
        .unwrap();
        assert!(!again.created);
        assert_eq!(again.holding.id, approval.holding.id);
        assert_eq!(store.holdings().len(), 1);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_distributor_approval_errors() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _rx) = SideEffectQueue::channel(store.clone(), 16);
        let distributor = submit_application(store.as_ref(), form(ApplicationKind::Distributor))
            .await
            .unwrap();
        let filmmaker = submit_application(store.as_ref(), form(ApplicationKind::Filmmaker))
            .await
            .unwrap();

        let err = approve_distributor(store.as_ref(), &queue, "http://x", distributor.id, 999)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::NotFound(_)));

        let err = approve_distributor(store.as_ref(), &queue, "http://x", 12345, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::NotFound(_)));

        let err = approve_distributor(store.as_ref(), &queue, "http://x", filmmaker.id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_reject() {
        let store = Arc::new(MemoryStore::new());
        let (queue, mut rx) = SideEffectQueue::channel(store.clone(), 16);
        let app = submit_application(store.as_ref(), form(ApplicationKind::Distributor))
            .await
            .unwrap();

        let rejected = reject_application(store.as_ref(), &queue, app.id).await.unwrap();
        assert_eq!(rejected.status, "rejected");
        let jobs = drain(&mut rx);
        assert_eq!(jobs.len(), 1);

        // 거절된 신청서는 승인 불가
        let err = approve_distributor(store.as_ref(), &queue, "http://x", app.id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ApprovalError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let store = MemoryStore::new();
        let mut bad = form(ApplicationKind::Filmmaker);
        bad.film_title = None;
        assert!(matches!(
            submit_application(&store, bad).await,
            Err(ApprovalError::Invalid(_))
        ));

        let mut bad = form(ApplicationKind::Distributor);
        bad.email = "nope".into();
        assert!(matches!(
            submit_application(&store, bad).await,
            Err(ApprovalError::Invalid(_))
        ));
    }
}
