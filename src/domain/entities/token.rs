use serde::{Serialize, Deserialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub admin: bool,
    pub exp: usize,
    pub iat: usize,
}
