//! HTTP/2 connection preamble fingerprint
//!
//! Browsers are told apart by the first frames they send on a new HTTP/2
//! connection: the SETTINGS values and their order, the size of the
//! connection-level WINDOW_UPDATE, any PRIORITY frames and the layout of the
//! first HEADERS frame. [`Http2FrameConfig`] holds all of them and is usually
//! written in the Akamai notation:
//!
//! ```text
//! SETTINGS|WINDOW_UPDATE|PRIORITY|PSEUDO_HEADER_ORDER
//! 1:65536;2:0;4:6291456;6:262144|15663105|0|m,a,s,p
//! ```
//!
//! SETTINGS are `id:value` pairs joined by `;`, the window update is the
//! increment (`0` for none), PRIORITY frames are `stream:exclusive:dependency:weight`
//! entries joined by `,` (`0` for none) and the pseudo header order lists the
//! first letters of `:method`, `:authority`, `:scheme` and `:path`.
//!
//! The priority carried by HEADERS frames is not part of the notation and is
//! set with [`Http2FrameConfig::with_headers_priority`].

use std::{collections::HashSet, fmt, str::FromStr};

use h2::frame::{PseudoId, PseudoOrder, Priorities, Priority, SettingsOrder, StreamDependency, StreamId};

/// The flow-control window every HTTP/2 connection starts with.
pub const DEFAULT_WINDOW_SIZE: u32 = 65_535;

/// The largest flow-control window allowed by RFC 9113.
pub const MAX_WINDOW_SIZE: u32 = (1 << 31) - 1;

/// The smallest WINDOW_UPDATE increment written with the preamble. Smaller
/// increments are held back by flow control until more capacity is released.
pub const MIN_WINDOW_INCREMENT: u32 = DEFAULT_WINDOW_SIZE / 2;

const MIN_MAX_FRAME_SIZE: u32 = 16_384;
const MAX_MAX_FRAME_SIZE: u32 = (1 << 24) - 1;
const MAX_STREAM_ID: u32 = (1 << 31) - 1;
// unknown identifiers above this cannot be written
const MAX_SETTING_ID: u16 = 15;

/// An HTTP/2 SETTINGS parameter identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingId {
    /// `SETTINGS_HEADER_TABLE_SIZE` (0x1)
    HeaderTableSize,
    /// `SETTINGS_ENABLE_PUSH` (0x2)
    EnablePush,
    /// `SETTINGS_MAX_CONCURRENT_STREAMS` (0x3)
    MaxConcurrentStreams,
    /// `SETTINGS_INITIAL_WINDOW_SIZE` (0x4)
    InitialWindowSize,
    /// `SETTINGS_MAX_FRAME_SIZE` (0x5)
    MaxFrameSize,
    /// `SETTINGS_MAX_HEADER_LIST_SIZE` (0x6)
    MaxHeaderListSize,
    /// `SETTINGS_ENABLE_CONNECT_PROTOCOL` (0x8)
    EnableConnectProtocol,
    /// `SETTINGS_NO_RFC7540_PRIORITIES` (0x9)
    NoRfc7540Priorities,
    /// Any other identifier, sent as is.
    Unknown(u16),
}

impl SettingId {
    /// The identifier on the wire.
    pub fn code(&self) -> u16 {
        match *self {
            SettingId::HeaderTableSize => 0x1,
            SettingId::EnablePush => 0x2,
            SettingId::MaxConcurrentStreams => 0x3,
            SettingId::InitialWindowSize => 0x4,
            SettingId::MaxFrameSize => 0x5,
            SettingId::MaxHeaderListSize => 0x6,
            SettingId::EnableConnectProtocol => 0x8,
            SettingId::NoRfc7540Priorities => 0x9,
            SettingId::Unknown(code) => code,
        }
    }
}

impl From<u16> for SettingId {
    fn from(code: u16) -> Self {
        match code {
            0x1 => SettingId::HeaderTableSize,
            0x2 => SettingId::EnablePush,
            0x3 => SettingId::MaxConcurrentStreams,
            0x4 => SettingId::InitialWindowSize,
            0x5 => SettingId::MaxFrameSize,
            0x6 => SettingId::MaxHeaderListSize,
            0x8 => SettingId::EnableConnectProtocol,
            0x9 => SettingId::NoRfc7540Priorities,
            other => SettingId::Unknown(other),
        }
    }
}

/// One SETTINGS parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    /// The parameter.
    pub id: SettingId,
    /// Its value.
    pub value: u32,
}

/// A PRIORITY frame sent right after the preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamPriority {
    /// The (idle) stream the priority is declared for.
    pub stream_id: u32,
    /// Exclusive dependency flag.
    pub exclusive: bool,
    /// The stream depended upon, `0` for the root.
    pub dependency: u32,
    /// Weight between 1 and 256. The wire carries `weight - 1`.
    pub weight: u16,
}

/// The priority field of the HEADERS frame that opens a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadersPriority {
    /// Exclusive dependency flag.
    pub exclusive: bool,
    /// The stream depended upon, `0` for the root.
    pub dependency: u32,
    /// Weight between 1 and 256. The wire carries `weight - 1`.
    pub weight: u16,
}

/// A pseudo header, as listed in the fingerprint's last section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoHeader {
    /// `:method`
    Method,
    /// `:authority`
    Authority,
    /// `:scheme`
    Scheme,
    /// `:path`
    Path,
}

impl PseudoHeader {
    fn letter(&self) -> char {
        match self {
            PseudoHeader::Method => 'm',
            PseudoHeader::Authority => 'a',
            PseudoHeader::Scheme => 's',
            PseudoHeader::Path => 'p',
        }
    }

    fn pseudo_id(&self) -> PseudoId {
        match self {
            PseudoHeader::Method => PseudoId::Method,
            PseudoHeader::Authority => PseudoId::Authority,
            PseudoHeader::Scheme => PseudoId::Scheme,
            PseudoHeader::Path => PseudoId::Path,
        }
    }
}

/// The ordered frames a client writes after the HTTP/2 connection preface.
///
/// Built once per client and shared read-only by every connection it opens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Http2FrameConfig {
    settings: Vec<Setting>,
    window_increment: u32,
    priorities: Vec<StreamPriority>,
    pseudo_order: Vec<PseudoHeader>,
    headers_priority: Option<HeadersPriority>,
}

impl Http2FrameConfig {
    /// Create a config from its parts, validating every value.
    pub fn new(
        settings: Vec<Setting>,
        window_increment: u32,
        priorities: Vec<StreamPriority>,
    ) -> Result<Self, Http2FingerprintError> {
        let config = Http2FrameConfig {
            settings,
            window_increment,
            priorities,
            pseudo_order: Vec::new(),
            headers_priority: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// A built-in config. The values are trusted and not validated.
    pub(crate) fn preset(
        settings: &[(u16, u32)],
        window_increment: u32,
        priorities: &[(u32, bool, u32, u16)],
        pseudo_order: [PseudoHeader; 4],
        headers_priority: Option<(bool, u32, u16)>,
    ) -> Self {
        Http2FrameConfig {
            settings: settings
                .iter()
                .map(|&(id, value)| Setting {
                    id: SettingId::from(id),
                    value,
                })
                .collect(),
            window_increment,
            priorities: priorities
                .iter()
                .map(|&(stream_id, exclusive, dependency, weight)| StreamPriority {
                    stream_id,
                    exclusive,
                    dependency,
                    weight,
                })
                .collect(),
            pseudo_order: pseudo_order.to_vec(),
            headers_priority: headers_priority.map(|(exclusive, dependency, weight)| HeadersPriority {
                exclusive,
                dependency,
                weight,
            }),
        }
    }

    /// Send `priority` with the HEADERS frame of every request.
    pub fn with_headers_priority(mut self, priority: HeadersPriority) -> Result<Self, Http2FingerprintError> {
        let valid = priority.dependency <= MAX_STREAM_ID && (1..=256).contains(&priority.weight);
        if !valid {
            return Err(Http2FingerprintError::InvalidHeadersPriority(priority));
        }
        self.headers_priority = Some(priority);
        Ok(self)
    }

    /// The SETTINGS parameters in wire order.
    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    /// The connection-level WINDOW_UPDATE increment, `0` for none.
    pub fn window_increment(&self) -> u32 {
        self.window_increment
    }

    /// The PRIORITY frames in wire order.
    pub fn priorities(&self) -> &[StreamPriority] {
        &self.priorities
    }

    /// The pseudo header order of request HEADERS frames. Empty keeps the
    /// `m,s,a,p` default.
    pub fn pseudo_order(&self) -> &[PseudoHeader] {
        &self.pseudo_order
    }

    /// The priority sent with request HEADERS frames.
    pub fn headers_priority(&self) -> Option<HeadersPriority> {
        self.headers_priority
    }

    /// The configured value of a SETTINGS parameter.
    pub fn value(&self, id: SettingId) -> Option<u32> {
        self.settings.iter().find(|s| s.id == id).map(|s| s.value)
    }

    /// The connection window after the initial WINDOW_UPDATE.
    pub fn connection_window(&self) -> u32 {
        DEFAULT_WINDOW_SIZE + self.window_increment
    }

    /// The id of the first request stream: `1`, or the first odd id above
    /// every stream a PRIORITY frame was declared for.
    pub fn initial_stream_id(&self) -> u32 {
        match self.priorities.iter().map(|p| p.stream_id).max() {
            Some(max) => (max + 2) | 1,
            None => 1,
        }
    }

    fn validate(&self) -> Result<(), Http2FingerprintError> {
        let mut seen = HashSet::with_capacity(self.settings.len());
        for setting in &self.settings {
            if !seen.insert(setting.id) {
                return Err(Http2FingerprintError::DuplicateSetting(setting.id.code()));
            }

            let code = setting.id.code();
            if code == 0 || code > MAX_SETTING_ID {
                return Err(Http2FingerprintError::UnsupportedSetting(code));
            }

            let valid = match setting.id {
                SettingId::EnablePush | SettingId::EnableConnectProtocol | SettingId::NoRfc7540Priorities => {
                    setting.value <= 1
                }
                SettingId::InitialWindowSize => setting.value <= MAX_WINDOW_SIZE,
                SettingId::MaxFrameSize => {
                    (MIN_MAX_FRAME_SIZE..=MAX_MAX_FRAME_SIZE).contains(&setting.value)
                }
                _ => true,
            };
            if !valid {
                return Err(Http2FingerprintError::InvalidSettingValue(*setting));
            }
        }

        if self.window_increment > MAX_WINDOW_SIZE - DEFAULT_WINDOW_SIZE {
            return Err(Http2FingerprintError::WindowTooLarge(self.window_increment));
        }
        if (1..MIN_WINDOW_INCREMENT).contains(&self.window_increment) {
            return Err(Http2FingerprintError::WindowTooSmall(self.window_increment));
        }

        for priority in &self.priorities {
            // room is left for the first request stream above it
            let valid = priority.stream_id != 0
                && priority.stream_id <= MAX_STREAM_ID - 3
                && priority.dependency <= MAX_STREAM_ID
                && priority.dependency != priority.stream_id
                && (1..=256).contains(&priority.weight);
            if !valid {
                return Err(Http2FingerprintError::InvalidPriority(*priority));
            }
        }

        Ok(())
    }

    /// An `h2` client builder that writes this config's preamble and
    /// request HEADERS layout.
    pub(crate) fn client_builder(&self) -> h2::client::Builder {
        let mut builder = h2::client::Builder::new();

        let mut order = SettingsOrder::builder();
        let mut experimental = h2::frame::ExperimentalSettings::builder();
        for setting in &self.settings {
            order = order.push(h2::frame::SettingId::from(setting.id.code()));
            match setting.id {
                SettingId::HeaderTableSize => {
                    builder.header_table_size(setting.value);
                }
                SettingId::EnablePush => {
                    builder.enable_push(setting.value != 0);
                }
                SettingId::MaxConcurrentStreams => {
                    builder.max_concurrent_streams(setting.value);
                }
                SettingId::InitialWindowSize => {
                    builder.initial_window_size(setting.value);
                }
                SettingId::MaxFrameSize => {
                    builder.max_frame_size(setting.value);
                }
                SettingId::MaxHeaderListSize => {
                    builder.max_header_list_size(setting.value);
                }
                SettingId::EnableConnectProtocol => {
                    builder.enable_connect_protocol(setting.value != 0);
                }
                SettingId::NoRfc7540Priorities => {
                    builder.no_rfc7540_priorities(setting.value != 0);
                }
                SettingId::Unknown(code) => {
                    experimental = experimental.push(h2::frame::Setting::from_id(code, setting.value));
                }
            }
        }
        builder.settings_order(order.build());
        builder.experimental_settings(experimental.build());

        if self.window_increment > 0 {
            builder.initial_connection_window_size(self.connection_window());
        }

        if !self.priorities.is_empty() {
            let priorities = self.priorities.iter().fold(Priorities::builder(), |acc, p| {
                acc.push(Priority::new(
                    StreamId::from(p.stream_id),
                    StreamDependency::new(StreamId::from(p.dependency), (p.weight - 1) as u8, p.exclusive),
                ))
            });
            builder.priorities(priorities.build());
            builder.initial_stream_id(self.initial_stream_id());
        }

        if !self.pseudo_order.is_empty() {
            let order = self
                .pseudo_order
                .iter()
                .fold(PseudoOrder::builder(), |acc, header| acc.push(header.pseudo_id()));
            builder.headers_pseudo_order(order.build());
        }

        if let Some(p) = self.headers_priority {
            builder.headers_stream_dependency(StreamDependency::new(
                StreamId::from(p.dependency),
                (p.weight - 1) as u8,
                p.exclusive,
            ));
        }

        builder
    }
}

impl FromStr for Http2FrameConfig {
    type Err = Http2FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('|').collect();
        if !(3..=4).contains(&parts.len()) {
            return Err(Http2FingerprintError::SectionCount(parts.len()));
        }

        let settings = parse_settings(parts[0])?;
        let window_increment = parse_number("window update", parts[1])?;
        let priorities = parse_priorities(parts[2])?;
        let pseudo_order = match parts.get(3) {
            Some(section) => parse_pseudo_order(section)?,
            None => Vec::new(),
        };

        let mut config = Http2FrameConfig::new(settings, window_increment, priorities)?;
        config.pseudo_order = pseudo_order;
        Ok(config)
    }
}

fn parse_number<T: FromStr>(field: &'static str, value: &str) -> Result<T, Http2FingerprintError> {
    value
        .trim()
        .parse()
        .map_err(|_| Http2FingerprintError::InvalidNumber {
            field,
            value: value.trim().to_owned(),
        })
}

fn parse_settings(section: &str) -> Result<Vec<Setting>, Http2FingerprintError> {
    let section = section.trim();
    if section.is_empty() {
        return Ok(Vec::new());
    }

    section
        .split(';')
        .map(|entry| {
            let (id, value) = entry
                .split_once(':')
                .ok_or_else(|| Http2FingerprintError::InvalidEntry(entry.trim().to_owned()))?;
            Ok(Setting {
                id: SettingId::from(parse_number::<u16>("setting id", id)?),
                value: parse_number("setting value", value)?,
            })
        })
        .collect()
}

fn parse_priorities(section: &str) -> Result<Vec<StreamPriority>, Http2FingerprintError> {
    let section = section.trim();
    if section.is_empty() || section == "0" {
        return Ok(Vec::new());
    }

    section
        .split(',')
        .map(|entry| {
            let fields: Vec<&str> = entry.split(':').collect();
            let &[stream_id, exclusive, dependency, weight] = fields.as_slice() else {
                return Err(Http2FingerprintError::InvalidEntry(entry.trim().to_owned()));
            };
            let exclusive = match exclusive.trim() {
                "0" => false,
                "1" => true,
                _ => return Err(Http2FingerprintError::InvalidEntry(entry.trim().to_owned())),
            };
            Ok(StreamPriority {
                stream_id: parse_number("priority stream", stream_id)?,
                exclusive,
                dependency: parse_number("priority dependency", dependency)?,
                weight: parse_number("priority weight", weight)?,
            })
        })
        .collect()
}

fn parse_pseudo_order(section: &str) -> Result<Vec<PseudoHeader>, Http2FingerprintError> {
    let section = section.trim();
    if section.is_empty() {
        return Ok(Vec::new());
    }

    let mut order = Vec::with_capacity(4);
    for letter in section.split(',') {
        let header = match letter.trim() {
            "m" => PseudoHeader::Method,
            "a" => PseudoHeader::Authority,
            "s" => PseudoHeader::Scheme,
            "p" => PseudoHeader::Path,
            other => return Err(Http2FingerprintError::InvalidEntry(other.to_owned())),
        };
        if order.contains(&header) {
            return Err(Http2FingerprintError::InvalidEntry(letter.trim().to_owned()));
        }
        order.push(header);
    }
    Ok(order)
}

impl fmt::Display for Http2FrameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, setting) in self.settings.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}:{}", setting.id.code(), setting.value)?;
        }

        write!(f, "|{}|", self.window_increment)?;

        if self.priorities.is_empty() {
            f.write_str("0")?;
        }
        for (i, p) in self.priorities.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}:{}:{}", p.stream_id, p.exclusive as u8, p.dependency, p.weight)?;
        }

        f.write_str("|")?;
        for (i, header) in self.pseudo_order.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", header.letter())?;
        }
        Ok(())
    }
}

/// A malformed HTTP/2 fingerprint.
#[derive(Debug)]
pub enum Http2FingerprintError {
    /// The string does not have three or four `|` separated sections.
    SectionCount(usize),
    /// A number could not be parsed.
    InvalidNumber {
        /// What was being parsed.
        field: &'static str,
        /// The offending text.
        value: String,
    },
    /// An entry does not follow the expected shape.
    InvalidEntry(String),
    /// The same SETTINGS parameter appears twice.
    DuplicateSetting(u16),
    /// A SETTINGS value is out of its allowed range.
    InvalidSettingValue(Setting),
    /// A SETTINGS identifier that cannot be written.
    UnsupportedSetting(u16),
    /// The window increment would overflow the connection window.
    WindowTooLarge(u32),
    /// The window increment is too small to be written with the preamble.
    WindowTooSmall(u32),
    /// A PRIORITY entry is out of range.
    InvalidPriority(StreamPriority),
    /// The HEADERS priority is out of range.
    InvalidHeadersPriority(HeadersPriority),
}

impl fmt::Display for Http2FingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Http2FingerprintError::SectionCount(n) => {
                write!(f, "expected 3 or 4 sections in http2 fingerprint, found {n}")
            }
            Http2FingerprintError::InvalidNumber { field, value } => {
                write!(f, "invalid {field} {value:?}")
            }
            Http2FingerprintError::InvalidEntry(entry) => write!(f, "invalid entry {entry:?}"),
            Http2FingerprintError::DuplicateSetting(id) => write!(f, "duplicate setting {id}"),
            Http2FingerprintError::InvalidSettingValue(s) => {
                write!(f, "value {} out of range for setting {}", s.value, s.id.code())
            }
            Http2FingerprintError::UnsupportedSetting(id) => write!(f, "setting {id} cannot be sent"),
            Http2FingerprintError::WindowTooLarge(n) => {
                write!(f, "window update increment {n} overflows the connection window")
            }
            Http2FingerprintError::WindowTooSmall(n) => {
                write!(f, "window update increment {n} is below {MIN_WINDOW_INCREMENT}")
            }
            Http2FingerprintError::InvalidPriority(p) => {
                write!(f, "invalid priority for stream {}", p.stream_id)
            }
            Http2FingerprintError::InvalidHeadersPriority(p) => {
                write!(f, "invalid headers priority on stream {} weight {}", p.dependency, p.weight)
            }
        }
    }
}

impl std::error::Error for Http2FingerprintError {}
