/// Fixed-width row record (100 bytes).
///
/// Layout:
///   id:       u32 (4 bytes, little-endian)
///   username: 32 bytes, NUL-padded
///   email:    64 bytes, NUL-padded
///
/// One byte of each text field is kept for the terminator, so a username
/// holds at most 31 bytes and an email at most 63.
use std::fmt;

use crate::error::{Result, RowDbError};

pub const ID_SIZE: usize = 4;
pub const USERNAME_SIZE: usize = 32;
pub const EMAIL_SIZE: usize = 64;
pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

pub const USERNAME_MAX_LEN: usize = USERNAME_SIZE - 1;
pub const EMAIL_MAX_LEN: usize = EMAIL_SIZE - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    /// Build a row, rejecting text that does not fit its field.
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let row = Row {
            id,
            username: username.into(),
            email: email.into(),
        };
        row.validate()?;
        Ok(row)
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.len() > USERNAME_MAX_LEN {
            return Err(RowDbError::StringTooLong {
                field: "username",
                max: USERNAME_MAX_LEN,
            });
        }
        if self.email.len() > EMAIL_MAX_LEN {
            return Err(RowDbError::StringTooLong {
                field: "email",
                max: EMAIL_MAX_LEN,
            });
        }
        Ok(())
    }

    /// Encode into `dest`, which must be exactly `ROW_SIZE` bytes.
    /// Text longer than its field is truncated; call `validate` first.
    pub fn serialize(&self, dest: &mut [u8]) {
        debug_assert_eq!(dest.len(), ROW_SIZE);
        dest.fill(0);
        dest[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        write_text(
            &mut dest[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE],
            &self.username,
        );
        write_text(&mut dest[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE], &self.email);
    }

    pub fn deserialize(src: &[u8]) -> Result<Self> {
        if src.len() < ROW_SIZE {
            return Err(RowDbError::Corruption(format!(
                "row buffer is {} bytes, expected {}",
                src.len(),
                ROW_SIZE
            )));
        }
        let id = u32::from_le_bytes(src[ID_OFFSET..ID_OFFSET + ID_SIZE].try_into().unwrap());
        let username = read_text(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE], "username")?;
        let email = read_text(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE], "email")?;
        Ok(Row {
            id,
            username,
            email,
        })
    }

    pub fn to_bytes(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        self.serialize(&mut buf);
        buf
    }
}

fn write_text(field: &mut [u8], text: &str) {
    let bytes = text.as_bytes();
    let len = bytes.len().min(field.len() - 1);
    field[..len].copy_from_slice(&bytes[..len]);
}

fn read_text(field: &[u8], name: &str) -> Result<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8(field[..end].to_vec())
        .map_err(|_| RowDbError::Corruption(format!("{} is not valid UTF-8", name)))
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(USERNAME_OFFSET, 4);
        assert_eq!(EMAIL_OFFSET, 36);
        assert_eq!(ROW_SIZE, 100);
    }

    #[test]
    fn test_round_trip() {
        let row = Row::new(42, "alice", "alice@example.com").unwrap();
        let decoded = Row::deserialize(&row.to_bytes()).unwrap();
        assert_eq!(decoded, row);
    }

    #[test]
    fn test_round_trip_at_field_limits() {
        let username = "u".repeat(USERNAME_MAX_LEN);
        let email = "e".repeat(EMAIL_MAX_LEN);
        let row = Row::new(u32::MAX, username.clone(), email.clone()).unwrap();
        let decoded = Row::deserialize(&row.to_bytes()).unwrap();
        assert_eq!(decoded.id, u32::MAX);
        assert_eq!(decoded.username, username);
        assert_eq!(decoded.email, email);
    }

    #[test]
    fn test_byte_layout() {
        let row = Row::new(0x01020304, "ab", "c").unwrap();
        let bytes = row.to_bytes();
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..7], b"ab\0");
        assert_eq!(&bytes[36..38], b"c\0");
        assert!(bytes[38..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rejects_long_fields() {
        let err = Row::new(1, "u".repeat(USERNAME_SIZE), "e").unwrap_err();
        assert!(matches!(err, RowDbError::StringTooLong { field: "username", .. }));

        let err = Row::new(1, "u", "e".repeat(EMAIL_SIZE)).unwrap_err();
        assert!(matches!(err, RowDbError::StringTooLong { field: "email", .. }));
    }

    #[test]
    fn test_invalid_utf8_is_corruption() {
        let mut bytes = Row::new(1, "x", "y").unwrap().to_bytes();
        bytes[USERNAME_OFFSET] = 0xFF;
        assert!(matches!(
            Row::deserialize(&bytes),
            Err(RowDbError::Corruption(_))
        ));
    }

    #[test]
    fn test_display() {
        let row = Row::new(1, "ann", "a@x").unwrap();
        assert_eq!(row.to_string(), "(1, ann, a@x)");
    }
}
