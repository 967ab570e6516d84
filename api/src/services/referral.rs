//! Referral Attribution
//!
//! distributor 개인 링크: `{APP_URL}/films?ref=<code>&film=<film_id>`
//!
//! 코드는 distributor/영화와 구조적 관계가 없는 랜덤 토큰이며,
//! 코드 -> holding 해석은 DB 조회로만 이루어진다. 만료/1회용 제약 없음.

use rand::RngCore;
use reqwest::Url;

/// 코드 바이트 수 (hex 인코딩 시 32자)
const REFERRAL_CODE_BYTES: usize = 16;

/// 랜덤 referral 코드 생성
pub fn generate_referral_code() -> String {
    let mut bytes = [0u8; REFERRAL_CODE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 전체 referral URL 생성
pub fn create_referral_link(base_url: &str, referral_code: &str, film_id: Option<i64>) -> String {
    let base = base_url.trim_end_matches('/');
    match Url::parse(&format!("{}/films", base)) {
        Ok(mut url) => {
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("ref", referral_code);
                if let Some(film_id) = film_id {
                    query.append_pair("film", &film_id.to_string());
                }
            }
            url.to_string()
        }
        // base가 URL이 아니면 그대로 이어붙인다
        Err(_) => match film_id {
            Some(film_id) => format!("{}/films?ref={}&film={}", base, referral_code, film_id),
            None => format!("{}/films?ref={}", base, referral_code),
        },
    }
}

/// URL에서 referral 코드 추출
pub fn extract_referral_code(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "ref")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

/// 사용자가 보낸 referral 값 정리
///
/// 코드 그대로 보내거나 개인 링크 전체를 붙여넣는 경우 모두 코드로 변환한다.
/// 빈 값은 None
pub fn normalize_referral(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.contains("://") {
        return extract_referral_code(value);
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_format() {
        let code = generate_referral_code();
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes: std::collections::HashSet<_> =
            (0..100).map(|_| generate_referral_code()).collect();
        assert_eq!(codes.len(), 100);
    }

    #[test]
    fn test_link_contains_code_and_film() {
        let link = create_referral_link("https://quiflix.com/", "abc123", Some(42));
        assert_eq!(link, "https://quiflix.com/films?ref=abc123&film=42");
    }

    #[test]
    fn test_link_without_film() {
        let link = create_referral_link("http://localhost:3000", "abc123", None);
        assert_eq!(link, "http://localhost:3000/films?ref=abc123");
    }

    #[test]
    fn test_extract_round_trip() {
        let code = generate_referral_code();
        let link = create_referral_link("http://localhost:3000", &code, Some(7));
        assert_eq!(extract_referral_code(&link), Some(code));
    }

    #[test]
    fn test_normalize_accepts_code_or_link() {
        assert_eq!(normalize_referral(" abc123 "), Some("abc123".to_string()));
        assert_eq!(
            normalize_referral("https://quiflix.com/films?ref=abc123&film=4"),
            Some("abc123".to_string())
        );
        assert_eq!(normalize_referral("https://quiflix.com/films?film=4"), None);
        assert_eq!(normalize_referral("   "), None);
    }

    #[test]
    fn test_extract_invalid() {
        assert_eq!(extract_referral_code("not a url"), None);
        assert_eq!(extract_referral_code("https://quiflix.com/films?film=1"), None);
    }
}
