//! Parsers for the text values returned by control variables.
//!
//! - `/tunerN/status`: `ch=8vsb:183000000 lock=8vsb ss=83 snq=90 seq=100 bps=19394080 pps=0`
//! - `/tunerN/streaminfo`: one `<program>: <vct number> <vct name>` line per program
//! - `/tunerN/target`: a URL such as `rtp://192.168.1.5:5000`, or `none`

use url::Url;

/// Channel numbers are small; tuned frequencies are reported in Hz.
const MIN_FREQUENCY_HZ: u64 = 1_000_000;

/// Parsed `/tunerN/status` value.
///
/// Numeric fields reported as zero are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunerStatusLine {
    pub channel: Option<String>,
    pub lock: Option<String>,
    pub signal_strength: Option<u32>,
    pub signal_quality: Option<u32>,
    pub symbol_quality: Option<u32>,
    pub bits_per_second: Option<u64>,
    pub packets_per_second: Option<u64>,
}

impl TunerStatusLine {
    pub fn parse(value: &str) -> Self {
        let mut status = Self::default();

        for detail in value.split_whitespace() {
            let Some((key, raw)) = detail.split_once('=') else {
                continue;
            };
            match key {
                "ch" => status.channel = text_value(raw),
                "lock" => status.lock = text_value(raw),
                "ss" => status.signal_strength = number(raw),
                "snq" => status.signal_quality = number(raw),
                "seq" => status.symbol_quality = number(raw),
                "bps" => status.bits_per_second = number(raw),
                "pps" => status.packets_per_second = number(raw),
                _ => {}
            }
        }

        status
    }

    /// Tuned frequency in Hz when the channel is expressed as one.
    pub fn frequency(&self) -> Option<u64> {
        let (_, tail) = self.channel.as_deref()?.rsplit_once(':')?;
        tail.parse::<u64>()
            .ok()
            .filter(|hz| *hz >= MIN_FREQUENCY_HZ)
    }

    /// Whether the tuner is locked onto a signal.
    pub fn is_locked(&self) -> bool {
        self.symbol_quality.is_some()
    }
}

fn text_value(raw: &str) -> Option<String> {
    match raw {
        "" | "none" => None,
        other => Some(other.to_string()),
    }
}

fn number<T>(raw: &str) -> Option<T>
where
    T: std::str::FromStr + PartialEq + Default,
{
    raw.parse::<T>().ok().filter(|value| *value != T::default())
}

/// A program line from `/tunerN/streaminfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamProgram {
    pub program: String,
    pub vct_number: String,
    pub vct_name: Option<String>,
}

/// Parse every program line, skipping `tsid=` and other trailer lines.
pub fn parse_stream_info(value: &str) -> Vec<StreamProgram> {
    value
        .lines()
        .filter_map(|line| {
            let (program, rest) = line.trim().split_once(": ")?;
            if program.is_empty() || !program.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let mut parts = rest.splitn(2, ' ');
            let vct_number = parts.next().filter(|n| !n.is_empty())?.to_string();
            let vct_name = parts
                .next()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string);
            Some(StreamProgram {
                program: program.to_string(),
                vct_number,
                vct_name,
            })
        })
        .collect()
}

/// Program entry for the currently selected `/tunerN/program` value.
///
/// Program `0` means nothing is selected.
pub fn find_program<I>(programs: I, program: &str) -> Option<StreamProgram>
where
    I: IntoIterator<Item = StreamProgram>,
{
    let program = program.trim();
    if program.is_empty() || program == "0" {
        return None;
    }
    programs.into_iter().find(|entry| entry.program == program)
}

/// Host part of a `/tunerN/target` value.
pub fn target_host(value: &str) -> Option<String> {
    let value = value.split_whitespace().next().unwrap_or_default();
    if value.is_empty() || value == "none" {
        return None;
    }
    Url::parse(value)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
}
