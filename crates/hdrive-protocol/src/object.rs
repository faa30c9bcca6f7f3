//! 对象读写协议
//!
//! - 读请求：`<objRead a="{index}" b="{subindex}" />`
//! - 读响应：`<r a="{index}" b="{subindex}" v="{value}" />`
//! - 写请求：`<objWrite a="{index}" b="{subindex}" c="{value}" />`（驱动器不回复）
//!
//! 请求解析（[`decode_object_request`]）与响应构建（[`encode_object_response`]）
//! 供设备模拟器使用。

use crate::{DEVICE_ERROR_MARKER, ObjectRef, ProtocolError};

/// 构建对象读请求
pub fn encode_object_read(obj: ObjectRef) -> Vec<u8> {
    format!("<objRead a=\"{}\" b=\"{}\" />", obj.index, obj.subindex).into_bytes()
}

/// 构建对象写请求
pub fn encode_object_write(obj: ObjectRef, value: i32) -> Vec<u8> {
    format!(
        "<objWrite a=\"{}\" b=\"{}\" c=\"{}\" />",
        obj.index, obj.subindex, value
    )
    .into_bytes()
}

/// 在累积的接收缓冲区中查找一条完整的 `<r ... />` 响应
///
/// 返回响应文本（从 `<r` 到 `/>`，含两端）。缓冲区中响应之前的字节被忽略。
pub fn find_object_response(buf: &[u8]) -> Option<String> {
    let mut from = 0;
    while let Some(offset) = find_subslice(&buf[from..], b"<r") {
        let start = from + offset;
        let after_tag = start + 2;
        match buf.get(after_tag) {
            None => return None,
            Some(b) if b.is_ascii_whitespace() => {
                // 第一个 '>' 必须是 "/>" 的一部分
                let close = buf[after_tag..].iter().position(|&b| b == b'>')? + after_tag;
                if buf[close - 1] == b'/' {
                    return Some(String::from_utf8_lossy(&buf[start..=close]).into_owned());
                }
            },
            Some(_) => {},
        }
        from = after_tag;
    }
    None
}

/// 解析对象读响应，返回对象值
///
/// # 错误
/// - `ProtocolError::DeviceError`: 响应含错误标记
/// - `ProtocolError::MissingValue`: 找不到 `v` 字段或其值不是 `i32`
pub fn decode_object_response(text: &str) -> Result<i32, ProtocolError> {
    if text.contains(DEVICE_ERROR_MARKER) {
        return Err(ProtocolError::DeviceError {
            response: text.to_string(),
        });
    }

    attribute(text, "v")
        .and_then(|v| v.parse::<i32>().ok())
        .ok_or_else(|| ProtocolError::MissingValue {
            response: text.to_string(),
        })
}

/// 解析响应中的对象地址（`a` / `b` 属性），缺失时返回 `None`
pub fn response_object(text: &str) -> Option<ObjectRef> {
    let index = attribute(text, "a")?.parse().ok()?;
    let subindex = attribute(text, "b")?.parse().ok()?;
    Some(ObjectRef::new(index, subindex))
}

/// 对象请求（设备侧视角）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRequest {
    Read(ObjectRef),
    Write(ObjectRef, i32),
}

/// 解析一条对象请求文本
pub fn decode_object_request(text: &str) -> Option<ObjectRequest> {
    let text = text.trim();
    let obj = || -> Option<ObjectRef> {
        Some(ObjectRef::new(
            attribute(text, "a")?.parse().ok()?,
            attribute(text, "b")?.parse().ok()?,
        ))
    };

    if text.starts_with("<objRead") {
        obj().map(ObjectRequest::Read)
    } else if text.starts_with("<objWrite") {
        let value = attribute(text, "c")?.parse().ok()?;
        obj().map(|o| ObjectRequest::Write(o, value))
    } else {
        None
    }
}

/// 构建对象读响应
pub fn encode_object_response(obj: ObjectRef, value: i32) -> Vec<u8> {
    format!(
        "<r a=\"{}\" b=\"{}\" v=\"{}\" />",
        obj.index, obj.subindex, value
    )
    .into_bytes()
}

/// 查找 ` name="..."` 属性值（属性名前必须是空白）
fn attribute<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{name}=\"");
    let mut from = 0;
    while let Some(offset) = text[from..].find(&pattern) {
        let start = from + offset;
        let preceded_by_space = text[..start].chars().next_back().is_some_and(char::is_whitespace);
        let value_start = start + pattern.len();
        if preceded_by_space {
            let len = text[value_start..].find('"')?;
            return Some(&text[value_start..value_start + len]);
        }
        from = value_start;
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
