use std::collections::HashMap;
use std::str;

#[derive(Debug, Clone, PartialEq)]
pub enum BencodeValue {
    Integer(i64),
    ByteString(Vec<u8>),
    List(Vec<BencodeValue>),
    Dictionary(HashMap<String, BencodeValue>),
}

impl BencodeValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            BencodeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BencodeValue::ByteString(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Lossy UTF-8 view of a byte string; trackers are not strict about encodings.
    pub fn as_string(&self) -> Option<String> {
        self.as_bytes()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

pub fn parse_bencode(data: &[u8]) -> Result<(BencodeValue, &[u8]), String> {
    let first = *data.first().ok_or("Unexpected end of bencode data")?;
    match first as char {
        'i' => {
            let end = data
                .iter()
                .position(|&x| x == b'e')
                .ok_or("Invalid integer")?;
            let num = str::from_utf8(&data[1..end])
                .map_err(|e| e.to_string())?
                .parse::<i64>()
                .map_err(|e| e.to_string())?;
            Ok((BencodeValue::Integer(num), &data[end + 1..]))
        }
        '0'..='9' => {
            let colon = data
                .iter()
                .position(|&x| x == b':')
                .ok_or("Invalid byte string")?;
            let length = str::from_utf8(&data[..colon])
                .map_err(|e| e.to_string())?
                .parse::<usize>()
                .map_err(|e| e.to_string())?;
            let start = colon + 1;
            let end = start
                .checked_add(length)
                .filter(|&end| end <= data.len())
                .ok_or("Byte string length exceeds input")?;
            Ok((BencodeValue::ByteString(data[start..end].to_vec()), &data[end..]))
        }
        'l' => {
            let mut list = Vec::new();
            let mut rest = &data[1..];
            while peek(rest)? != b'e' {
                let (value, new_rest) = parse_bencode(rest)?;
                list.push(value);
                rest = new_rest;
            }
            Ok((BencodeValue::List(list), &rest[1..]))
        }
        'd' => {
            let mut dict = HashMap::new();
            let mut rest = &data[1..];
            while peek(rest)? != b'e' {
                let (key, value, new_rest) = parse_entry(rest)?;
                dict.insert(key, value);
                rest = new_rest;
            }
            Ok((BencodeValue::Dictionary(dict), &rest[1..]))
        }
        _ => Err("Invalid bencode".to_string()),
    }
}

/// Returns the exact bytes of `key`'s value inside the top-level dictionary
/// in `data`, as they appear on the wire. Info hashes must be computed over
/// these bytes rather than a re-encoding.
pub fn raw_dictionary_value<'a>(data: &'a [u8], key: &str) -> Result<&'a [u8], String> {
    if peek(data)? != b'd' {
        return Err("Expected a dictionary".to_string());
    }
    let mut rest = &data[1..];
    while peek(rest)? != b'e' {
        let (entry_key, value_start) = parse_bencode(rest)?;
        let (_, value_end) = parse_bencode(value_start)?;
        if entry_key.as_bytes() == Some(key.as_bytes()) {
            let consumed = value_start.len() - value_end.len();
            return Ok(&value_start[..consumed]);
        }
        rest = value_end;
    }
    Err(format!("Missing {}", key))
}

fn parse_entry(data: &[u8]) -> Result<(String, BencodeValue, &[u8]), String> {
    let (key, rest) = parse_bencode(data)?;
    let key = if let BencodeValue::ByteString(bytes) = key {
        String::from_utf8(bytes).map_err(|e| e.to_string())?
    } else {
        return Err("Dictionary key must be a byte string".to_string());
    };
    let (value, rest) = parse_bencode(rest)?;
    Ok((key, value, rest))
}

fn peek(data: &[u8]) -> Result<u8, String> {
    data.first()
        .copied()
        .ok_or_else(|| "Unterminated list or dictionary".to_string())
}

/// Builds torrent and tracker fixtures for tests.
#[cfg(test)]
pub(crate) fn bencode_encode(value: &BencodeValue) -> Vec<u8> {
    match value {
        BencodeValue::Integer(i) => format!("i{}e", i).into_bytes(),
        BencodeValue::ByteString(s) => {
            let mut result = format!("{}:", s.len()).into_bytes();
            result.extend_from_slice(s);
            result
        }
        BencodeValue::List(l) => {
            let mut result = b"l".to_vec();
            for item in l {
                result.extend(bencode_encode(item));
            }
            result.push(b'e');
            result
        }
        BencodeValue::Dictionary(d) => {
            let mut result = b"d".to_vec();
            let mut keys: Vec<_> = d.keys().collect();
            keys.sort();
            for key in keys {
                result.extend(bencode_encode(&BencodeValue::ByteString(
                    key.as_bytes().to_vec(),
                )));
                result.extend(bencode_encode(&d[key]));
            }
            result.push(b'e');
            result
        }
    }
}
