use std::{str::SplitAsciiWhitespace, time::Duration};

use glam::{vec3, Vec3};
use log::info;

use crate::{asset::AssetT, config::SplatPollPolicy, error::SplatError, Aabb};

/// Splat positions only, the remaining per-splat attributes are left to the splat renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SplatCloud {
    points: Vec<Vec3>,
    bounds: Aabb,
}

impl SplatCloud {
    pub fn new(points: Vec<Vec3>) -> Self {
        let bounds = Aabb::from_points(points.iter().copied());
        SplatCloud { points, bounds }
    }

    pub fn from_ply(bytes: &[u8]) -> Result<Self, SplatError> {
        let header = Header::parse(bytes)?;
        let points = header.read_positions(&bytes[header.body_offset..])?;
        Ok(SplatCloud::new(points))
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounds in the cloud's own space, empty if there are no points.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}

impl AssetT for SplatCloud {
    fn from_bytes(bytes: &[u8]) -> Result<Self, anyhow::Error> {
        let cloud = SplatCloud::from_ply(bytes)?;
        info!(
            "Parsed splat cloud with {} points, bounds size {}",
            cloud.len(),
            cloud.bounds.size()
        );
        Ok(cloud)
    }
}

/// What [`BoundsPoller::tick`] found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    Pending,
    Ready(Aabb),
    /// Attempts are used up, the bounds never became usable.
    GaveUp,
}

/// Fallback for splat sources without a ready signal: check the bounds on a fixed interval until they are non-empty.
#[derive(Debug, Clone)]
pub struct BoundsPoller {
    policy: SplatPollPolicy,
    attempts: u32,
    since_last: Duration,
}

impl BoundsPoller {
    pub fn new(policy: SplatPollPolicy) -> Self {
        BoundsPoller {
            policy,
            attempts: 0,
            since_last: Duration::ZERO,
        }
    }

    pub fn tick(&mut self, dt: Duration, bounds: impl FnOnce() -> Aabb) -> PollOutcome {
        self.since_last += dt;
        if self.since_last < self.policy.interval {
            return PollOutcome::Pending;
        }
        self.since_last = Duration::ZERO;
        self.attempts += 1;

        let bounds = bounds();
        if !bounds.is_empty() {
            PollOutcome::Ready(bounds)
        } else if self.attempts >= self.policy.max_attempts {
            PollOutcome::GaveUp
        } else {
            PollOutcome::Pending
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Ascii,
    BinaryLittleEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Scalar {
    fn parse(name: &str) -> Result<Self, SplatError> {
        let scalar = match name {
            "char" | "int8" => Scalar::I8,
            "uchar" | "uint8" => Scalar::U8,
            "short" | "int16" => Scalar::I16,
            "ushort" | "uint16" => Scalar::U16,
            "int" | "int32" => Scalar::I32,
            "uint" | "uint32" => Scalar::U32,
            "float" | "float32" => Scalar::F32,
            "double" | "float64" => Scalar::F64,
            other => return Err(SplatError::Header(format!("unknown property type '{other}'"))),
        };
        Ok(scalar)
    }

    fn size(self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::F64 => 8,
        }
    }

    /// `bytes` has exactly `self.size()` bytes.
    fn decode_le(self, bytes: &[u8]) -> f64 {
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        match self {
            Scalar::I8 => buf[0] as i8 as f64,
            Scalar::U8 => buf[0] as f64,
            Scalar::I16 => i16::from_le_bytes([buf[0], buf[1]]) as f64,
            Scalar::U16 => u16::from_le_bytes([buf[0], buf[1]]) as f64,
            Scalar::I32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            Scalar::U32 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            Scalar::F32 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
            Scalar::F64 => f64::from_le_bytes(buf),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PropertyKind {
    Scalar(Scalar),
    List { count: Scalar, item: Scalar },
}

#[derive(Debug, Clone, PartialEq)]
struct Property {
    name: String,
    kind: PropertyKind,
}

#[derive(Debug, Clone, PartialEq)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

impl Element {
    /// Smallest number of bytes one binary row can take, lists counted as empty.
    fn min_row_size(&self) -> usize {
        self.properties
            .iter()
            .map(|p| match p.kind {
                PropertyKind::Scalar(scalar) => scalar.size(),
                PropertyKind::List { count, .. } => count.size(),
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Header {
    format: Format,
    elements: Vec<Element>,
    body_offset: usize,
}

impl Header {
    fn parse(bytes: &[u8]) -> Result<Self, SplatError> {
        let mut lines = HeaderLines { bytes, pos: 0 };
        match lines.next_line()? {
            Some("ply") => {}
            _ => return Err(SplatError::NotPly),
        }

        let mut format = None;
        let mut elements: Vec<Element> = vec![];
        loop {
            let Some(line) = lines.next_line()? else {
                return Err(SplatError::Header("missing end_header".into()));
            };
            let mut words = line.split_ascii_whitespace();
            match words.next() {
                Some("format") => {
                    format = Some(match words.next() {
                        Some("ascii") => Format::Ascii,
                        Some("binary_little_endian") => Format::BinaryLittleEndian,
                        Some(other) => return Err(SplatError::UnsupportedFormat(other.into())),
                        None => return Err(SplatError::Header("empty format line".into())),
                    });
                }
                Some("element") => {
                    let (Some(name), Some(count)) = (words.next(), words.next()) else {
                        return Err(SplatError::Header(format!("bad element line '{line}'")));
                    };
                    let count = count
                        .parse()
                        .map_err(|_| SplatError::Header(format!("bad element count '{count}'")))?;
                    elements.push(Element {
                        name: name.into(),
                        count,
                        properties: vec![],
                    });
                }
                Some("property") => {
                    let property = parse_property(words, line)?;
                    let Some(element) = elements.last_mut() else {
                        return Err(SplatError::Header("property before any element".into()));
                    };
                    element.properties.push(property);
                }
                Some("end_header") => break,
                Some("comment") | Some("obj_info") | None => {}
                Some(other) => {
                    return Err(SplatError::Header(format!("unexpected keyword '{other}'")))
                }
            }
        }

        let format = format.ok_or_else(|| SplatError::Header("missing format line".into()))?;
        Ok(Header {
            format,
            elements,
            body_offset: lines.pos,
        })
    }

    fn read_positions(&self, body: &[u8]) -> Result<Vec<Vec3>, SplatError> {
        let vertex = self
            .elements
            .iter()
            .position(|e| e.name == "vertex")
            .ok_or(SplatError::MissingPositions)?;
        let element = &self.elements[vertex];
        let index_of = |axis: &str| {
            element
                .properties
                .iter()
                .position(|p| p.name == axis && matches!(p.kind, PropertyKind::Scalar(_)))
                .ok_or(SplatError::MissingPositions)
        };
        let axes = [index_of("x")?, index_of("y")?, index_of("z")?];

        // a header can claim far more rows than the body holds, fail before reserving for them
        let min_row = element.min_row_size().max(1);
        if self.format == Format::BinaryLittleEndian
            && element.count.checked_mul(min_row).map_or(true, |needed| needed > body.len())
        {
            return Err(SplatError::Truncated {
                read: body.len() / min_row,
                expected: element.count,
            });
        }

        let mut values = match self.format {
            Format::Ascii => {
                let text = std::str::from_utf8(body)
                    .map_err(|e| SplatError::InvalidValue(format!("ascii body is not utf-8: {e}")))?;
                Values::Ascii(text.split_ascii_whitespace())
            }
            Format::BinaryLittleEndian => Values::Binary(body),
        };
        let truncated = |read: usize| SplatError::Truncated {
            read,
            expected: element.count,
        };

        // elements before the vertices still have to be walked over
        for skipped in &self.elements[..vertex] {
            if skipped.properties.is_empty() {
                continue;
            }
            for _ in 0..skipped.count {
                for property in &skipped.properties {
                    values.skip_property(&property.kind)?.ok_or_else(|| truncated(0))?;
                }
            }
        }

        let mut points = match self.format {
            Format::Ascii => Vec::new(),
            Format::BinaryLittleEndian => {
                Vec::with_capacity(element.count.min(body.len() / min_row))
            }
        };
        let mut row = [0f64; 3];
        for read in 0..element.count {
            for (i, property) in element.properties.iter().enumerate() {
                match property.kind {
                    PropertyKind::Scalar(scalar) => {
                        let value = values.next(scalar)?.ok_or_else(|| truncated(read))?;
                        if let Some(axis) = axes.iter().position(|a| *a == i) {
                            row[axis] = value;
                        }
                    }
                    PropertyKind::List { .. } => {
                        values.skip_property(&property.kind)?.ok_or_else(|| truncated(read))?;
                    }
                }
            }
            points.push(vec3(row[0] as f32, row[1] as f32, row[2] as f32));
        }
        Ok(points)
    }
}

fn parse_property<'a>(
    mut words: impl Iterator<Item = &'a str>,
    line: &str,
) -> Result<Property, SplatError> {
    let bad = || SplatError::Header(format!("bad property line '{line}'"));
    let first = words.next().ok_or_else(bad)?;
    let kind = if first == "list" {
        let count = Scalar::parse(words.next().ok_or_else(bad)?)?;
        let item = Scalar::parse(words.next().ok_or_else(bad)?)?;
        PropertyKind::List { count, item }
    } else {
        PropertyKind::Scalar(Scalar::parse(first)?)
    };
    let name = words.next().ok_or_else(bad)?;
    Ok(Property {
        name: name.into(),
        kind,
    })
}

struct HeaderLines<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> HeaderLines<'a> {
    fn next_line(&mut self) -> Result<Option<&'a str>, SplatError> {
        let rest = &self.bytes[self.pos..];
        let Some(len) = rest.iter().position(|b| *b == b'\n') else {
            return Ok(None);
        };
        self.pos += len + 1;
        let line = std::str::from_utf8(&rest[..len])
            .map_err(|_| SplatError::Header("header is not ascii".into()))?;
        Ok(Some(line.trim_end_matches('\r')))
    }
}

enum Values<'a> {
    Ascii(SplitAsciiWhitespace<'a>),
    Binary(&'a [u8]),
}

impl Values<'_> {
    /// `Ok(None)` once the body is exhausted.
    fn next(&mut self, scalar: Scalar) -> Result<Option<f64>, SplatError> {
        match self {
            Values::Ascii(tokens) => {
                let Some(token) = tokens.next() else {
                    return Ok(None);
                };
                token
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| SplatError::InvalidValue(token.into()))
            }
            Values::Binary(bytes) => {
                let size = scalar.size();
                let current = *bytes;
                if current.len() < size {
                    return Ok(None);
                }
                let (head, tail) = current.split_at(size);
                *bytes = tail;
                Ok(Some(scalar.decode_le(head)))
            }
        }
    }

    fn skip_property(&mut self, kind: &PropertyKind) -> Result<Option<()>, SplatError> {
        match *kind {
            PropertyKind::Scalar(scalar) => Ok(self.next(scalar)?.map(|_| ())),
            PropertyKind::List { count, item } => {
                let Some(n) = self.next(count)? else {
                    return Ok(None);
                };
                for _ in 0..n.max(0.0) as usize {
                    if self.next(item)?.is_none() {
                        return Ok(None);
                    }
                }
                Ok(Some(()))
            }
        }
    }
}
