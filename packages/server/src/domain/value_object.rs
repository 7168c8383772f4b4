//! Value Objects
//!
//! 接続ハンドル・クライアント ID・ルーム ID・タイムスタンプを表す値オブジェクト。
//! 生成時にバリデーションを行い、不正な値がドメイン層に入り込まないようにします。

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// ClientId / RoomId の最大文字数
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// サーバー側で生成する ClientId の文字数
pub const GENERATED_CLIENT_ID_LENGTH: usize = 6;

const CLIENT_ID_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 値オブジェクト生成時のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("ClientId must not be empty")]
    ClientIdEmpty,

    #[error("ClientId is too long (max {max} characters, got {actual})")]
    ClientIdTooLong { max: usize, actual: usize },

    #[error("RoomId must not be empty")]
    RoomIdEmpty,

    #[error("RoomId is too long (max {max} characters, got {actual})")]
    RoomIdTooLong { max: usize, actual: usize },
}

/// 接続ハンドル
///
/// Connection Registry が払い出す不透明な整数。
/// ルームは WebSocket そのものではなくこのハンドルの集合を保持します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// クライアント ID
///
/// 再接続をまたいで同一ユーザーを識別するトークン。接続ごとに一意ではない。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let length = value.chars().count();
        if value.trim().is_empty() {
            return Err(ValueObjectError::ClientIdEmpty);
        }
        if length > MAX_IDENTIFIER_LENGTH {
            return Err(ValueObjectError::ClientIdTooLong {
                max: MAX_IDENTIFIER_LENGTH,
                actual: length,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ClientId のファクトリ
///
/// クライアントが ID を名乗らなかった場合にサーバー側で払い出す。
/// 衝突確率は無視できる前提（36^6 通り）。
pub struct ClientIdFactory;

impl ClientIdFactory {
    /// 大文字英数字 6 文字の ClientId を生成
    pub fn generate() -> ClientId {
        let bytes = Uuid::new_v4().into_bytes();
        let id = bytes
            .iter()
            .take(GENERATED_CLIENT_ID_LENGTH)
            .map(|b| CLIENT_ID_ALPHABET[*b as usize % CLIENT_ID_ALPHABET.len()] as char)
            .collect();
        ClientId(id)
    }
}

/// ルーム ID（ルームコード）
///
/// 空でないこと以外の形式はサーバーでは強制しない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let length = value.chars().count();
        if value.trim().is_empty() {
            return Err(ValueObjectError::RoomIdEmpty);
        }
        if length > MAX_IDENTIFIER_LENGTH {
            return Err(ValueObjectError::RoomIdTooLong {
                max: MAX_IDENTIFIER_LENGTH,
                actual: length,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unix タイムスタンプ（UTC, ミリ秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
