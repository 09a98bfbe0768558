use rand::Rng;

/// Piece of a generator pattern: a fixed character or a set to draw from.
#[derive(Debug, Clone, PartialEq)]
enum Atom {
    Literal(char),
    Class(Vec<char>),
}

/// A tiny regex subset used by client profiles to describe identifiers.
///
/// Supported syntax: literal characters, `\x` escapes, `[...]` classes with
/// `a-z` style ranges, and an optional `{n}` repetition after any atom.
/// Only ASCII is accepted so the generated length in bytes equals
/// [`Pattern::len`].
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    atoms: Vec<(Atom, usize)>,
}

impl Pattern {
    pub fn parse(source: &str) -> Result<Self, String> {
        if !source.is_ascii() {
            return Err(format!("pattern must be ASCII: {}", source));
        }
        let chars: Vec<char> = source.chars().collect();
        let mut atoms = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let atom = match chars[i] {
                '\\' => {
                    let c = *chars
                        .get(i + 1)
                        .ok_or_else(|| format!("dangling escape in {}", source))?;
                    i += 2;
                    Atom::Literal(c)
                }
                '[' => {
                    let (class, next) = parse_class(&chars, i + 1)
                        .ok_or_else(|| format!("unterminated class in {}", source))?;
                    i = next;
                    Atom::Class(class)
                }
                c @ (']' | '{' | '}') => {
                    return Err(format!("unexpected '{}' in {}", c, source));
                }
                c => {
                    i += 1;
                    Atom::Literal(c)
                }
            };

            let mut count = 1;
            if chars.get(i) == Some(&'{') {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == '}')
                    .ok_or_else(|| format!("unterminated repetition in {}", source))?;
                let digits: String = chars[i + 1..i + close].iter().collect();
                count = digits
                    .parse::<usize>()
                    .map_err(|_| format!("invalid repetition '{}' in {}", digits, source))?;
                i += close + 1;
            }
            atoms.push((atom, count));
        }
        Ok(Self { atoms })
    }

    /// Length in bytes of every string this pattern generates.
    pub fn len(&self) -> usize {
        self.atoms.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut out = String::with_capacity(self.len());
        for (atom, count) in &self.atoms {
            for _ in 0..*count {
                match atom {
                    Atom::Literal(c) => out.push(*c),
                    Atom::Class(set) => out.push(set[rng.gen_range(0..set.len())]),
                }
            }
        }
        out
    }
}

// Returns the class members and the index just past the closing bracket.
fn parse_class(chars: &[char], start: usize) -> Option<(Vec<char>, usize)> {
    let mut members = Vec::new();
    let mut i = start;
    loop {
        let c = match *chars.get(i)? {
            ']' => break,
            '\\' => {
                i += 1;
                *chars.get(i)?
            }
            c => c,
        };
        i += 1;
        if chars.get(i) == Some(&'-') && chars.get(i + 1).is_some_and(|&c| c != ']') {
            let end = match chars[i + 1] {
                '\\' => {
                    i += 1;
                    *chars.get(i + 1)?
                }
                end => end,
            };
            if end < c {
                return None;
            }
            members.extend(c..=end);
            i += 2;
        } else {
            members.push(c);
        }
    }
    if members.is_empty() {
        return None;
    }
    members.sort_unstable();
    members.dedup();
    Some((members, i + 1))
}

pub const PEER_ID_LEN: usize = 20;
const DEFAULT_KEY_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct PeerIdGenerator {
    pattern: Pattern,
}

impl PeerIdGenerator {
    pub fn from_spec(generator: &str, pattern: &str) -> Result<Self, String> {
        match generator {
            "regex" => {
                let pattern = Pattern::parse(pattern)?;
                if pattern.len() != PEER_ID_LEN {
                    return Err(format!(
                        "peer id pattern produces {} bytes, expected {}",
                        pattern.len(),
                        PEER_ID_LEN
                    ));
                }
                Ok(Self { pattern })
            }
            other => Err(format!("unknown peer id generator '{}'", other)),
        }
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.pattern.generate(rng)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyGenerator {
    /// Eight uppercase hex digits, what libtorrent-based clients send.
    Hex,
    Pattern(Pattern),
}

impl KeyGenerator {
    pub fn from_spec(generator: &str, pattern: &str) -> Result<Self, String> {
        match generator {
            "default" => Ok(Self::Hex),
            "regex" => {
                let pattern = Pattern::parse(pattern)?;
                if pattern.is_empty() {
                    return Err("key pattern is empty".to_string());
                }
                Ok(Self::Pattern(pattern))
            }
            other => Err(format!("unknown key generator '{}'", other)),
        }
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        match self {
            Self::Hex => format!("{:0width$X}", rng.gen::<u32>(), width = DEFAULT_KEY_LEN),
            Self::Pattern(pattern) => pattern.generate(rng),
        }
    }
}

/// Bytes actually reported to the tracker after rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reported {
    pub downloaded: u64,
    pub uploaded: u64,
    pub left: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingPolicy {
    /// Downloads are reported in whole pieces until the torrent is complete.
    PieceAligned,
    Exact,
}

impl RoundingPolicy {
    pub fn from_spec(generator: &str) -> Result<Self, String> {
        match generator {
            "default" => Ok(Self::PieceAligned),
            "exact" => Ok(Self::Exact),
            other => Err(format!("unknown rounding generator '{}'", other)),
        }
    }

    /// `left == 0` means the candidate reached the total size; upload is
    /// never rounded.
    pub fn round(&self, downloaded: u64, uploaded: u64, left: u64, piece_size: u64) -> Reported {
        let total = downloaded + left;
        let downloaded = match self {
            Self::PieceAligned if left > 0 && piece_size > 0 => {
                piece_size * (downloaded / piece_size)
            }
            _ => downloaded,
        };
        Reported {
            downloaded,
            uploaded,
            left: total - downloaded,
        }
    }
}
