use crate::accounts::AccountKind;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT 使用的算法（明确指定，避免依赖默认值）
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,       // 账户 ID
    pub role: AccountKind,
    pub exp: usize,        // 过期时间 (Unix timestamp)
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == AccountKind::Admin
    }
}

pub struct JwtService {
    secret: String,
    ttl_seconds: i64,
}

impl JwtService {
    pub fn new(secret: String, ttl_seconds: u64) -> Result<Self, String> {
        let ttl_i64 = i64::try_from(ttl_seconds)
            .map_err(|_| "TTL时间溢出：超过i64最大值".to_string())?;

        if ttl_i64 <= 0 {
            return Err("TTL时间必须大于0".to_string());
        }

        if secret.is_empty() {
            return Err("JWT 密钥不能为空".to_string());
        }

        Ok(Self {
            secret,
            ttl_seconds: ttl_i64,
        })
    }

    /// 生成 JWT token
    pub fn generate_token(&self, subject: &str, role: AccountKind) -> anyhow::Result<String> {
        let expiration = Utc::now()
            .checked_add_signed(Duration::seconds(self.ttl_seconds))
            .ok_or_else(|| anyhow::anyhow!("时间计算溢出"))?
            .timestamp();

        let exp_usize = usize::try_from(expiration)
            .map_err(|_| anyhow::anyhow!("过期时间转换失败"))?;

        let claims = Claims {
            sub: subject.to_string(),
            role,
            exp: exp_usize,
        };

        let token = encode(
            &Header::new(JWT_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// 验证 JWT token（签名、算法和过期时间）
    pub fn validate_token(&self, token: &str) -> anyhow::Result<Claims> {
        let validation = Validation::new(JWT_ALGORITHM);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;

        Ok(token_data.claims)
    }

    /// 获取 token 有效期（秒）
    pub fn get_ttl_seconds(&self) -> u64 {
        self.ttl_seconds as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_keeps_role() {
        let service = JwtService::new("secret".to_string(), 60).unwrap();
        let token = service.generate_token("admin-1", AccountKind::Admin).unwrap();
        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "admin-1");
        assert!(claims.is_admin());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = JwtService::new("secret-a".to_string(), 60).unwrap();
        let verifier = JwtService::new("secret-b".to_string(), 60).unwrap();
        let token = issuer.generate_token("u", AccountKind::User).unwrap();
        assert!(verifier.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = JwtService::new("secret".to_string(), 60).unwrap();
        let claims = Claims {
            sub: "u".to_string(),
            role: AccountKind::User,
            exp: (Utc::now().timestamp() - 3600) as usize,
        };
        let token = encode(
            &Header::new(JWT_ALGORITHM),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn test_invalid_construction() {
        assert!(JwtService::new("secret".to_string(), 0).is_err());
        assert!(JwtService::new(String::new(), 60).is_err());
        assert_eq!(JwtService::new("s".to_string(), 90).unwrap().get_ttl_seconds(), 90);
    }
}
