//! The response envelope (§6): integer result codes plus a message. Only
//! `/api/question` carries its payload as a JSON-encoded string in `data`
//! (mirroring the original's generic envelope helper); every other
//! endpoint returns its own literal JSON shape per the endpoint table.

use serde::Serialize;

pub const RET_SUCCESS: i32 = 200;
pub const RET_UNKNOWN: i32 = -500;
#[allow(dead_code)]
pub const RET_READ: i32 = -501;
#[allow(dead_code)]
pub const RET_PARSE: i32 = -502;
#[allow(dead_code)]
pub const RET_UNMARSHAL: i32 = -503;
pub const RET_FORBIDDEN: i32 = 403;

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub ret: i32,
    pub msg: String,
    pub data: String,
}

impl Envelope {
    pub fn ok(data: impl Serialize) -> Self {
        Self {
            ret: RET_SUCCESS,
            msg: String::new(),
            data: serde_json::to_string(&data).unwrap_or_default(),
        }
    }

    pub fn error(ret: i32, msg: impl Into<String>) -> Self {
        Self {
            ret,
            msg: msg.into(),
            data: String::new(),
        }
    }
}
