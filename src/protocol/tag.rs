//! Tag event decoding
//!
//! A tag event is a frame whose primary line is
//! `ack taginfo=<group> <reader> <mode> <tagnum> <size> <detectstat> <subzone> <rssi> <utc> <count>`,
//! optionally followed by `tid=`, `epc=`, `user=` and `datainfo=` lines
//! depending on the reader's tag mode.

use std::fmt;
use std::str::FromStr;

use crate::error::{ReaderError, Result};
use super::frame::{AckLine, ResponseFrame};
use super::TAGINFO_KEY;

/// Fields in a `taginfo` line, including the leading `ack`
const TAGINFO_FIELDS: usize = 11;

/// One decoded tag detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    group_name: String,
    reader_name: String,
    response_mode: String,
    tag_number: String,
    tag_size: u32,
    detect_status: String,
    subzone: String,
    rssi: i32,
    timestamp: String,
    read_count: u32,

    tid: Option<String>,
    epc: Option<String>,
    user: Option<String>,
    data_info: Option<String>,
}

impl TagRecord {
    /// Decode a tag event frame
    pub fn decode(frame: &ResponseFrame) -> Result<Self> {
        let taginfo = frame
            .lines()
            .iter()
            .find(|line| line.contains(TAGINFO_KEY))
            .ok_or_else(|| ReaderError::Decode("no taginfo line".to_string()))?;

        let mut record = Self::parse_taginfo(taginfo)?;

        for line in frame.lines() {
            let ack = match AckLine::parse(line) {
                Some(ack) => ack,
                None => continue,
            };
            let slot = match ack.key {
                "tid" => &mut record.tid,
                "epc" => &mut record.epc,
                "user" => &mut record.user,
                "datainfo" => &mut record.data_info,
                _ => continue,
            };
            *slot = Some(ack.value.to_string());
        }

        Ok(record)
    }

    fn parse_taginfo(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != TAGINFO_FIELDS {
            return Err(ReaderError::Decode(format!(
                "taginfo has {} fields, expected {}: {:?}",
                fields.len(),
                TAGINFO_FIELDS,
                line
            )));
        }
        if fields[0] != "ack" {
            return Err(ReaderError::Decode(format!("taginfo is not an ack line: {:?}", line)));
        }
        let group_name = fields[1]
            .strip_prefix(TAGINFO_KEY)
            .ok_or_else(|| ReaderError::Decode(format!("missing taginfo key: {:?}", line)))?;

        Ok(Self {
            group_name: group_name.to_string(),
            reader_name: fields[2].to_string(),
            response_mode: fields[3].to_string(),
            tag_number: fields[4].to_string(),
            tag_size: parse_number("tag size", fields[5])?,
            detect_status: fields[6].to_string(),
            subzone: fields[7].to_string(),
            rssi: parse_number("rssi", fields[8])?,
            timestamp: fields[9].to_string(),
            read_count: parse_number("read count", fields[10])?,
            tid: None,
            epc: None,
            user: None,
            data_info: None,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Response/alert mode the reader reported the tag under
    pub fn response_mode(&self) -> &str {
        &self.response_mode
    }

    pub fn tag_number(&self) -> &str {
        &self.tag_number
    }

    pub fn tag_size(&self) -> u32 {
        self.tag_size
    }

    /// Detection status (e.g. `PRES`)
    pub fn detect_status(&self) -> &str {
        &self.detect_status
    }

    pub fn subzone(&self) -> &str {
        &self.subzone
    }

    /// Signal strength
    pub fn rssi(&self) -> i32 {
        self.rssi
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn read_count(&self) -> u32 {
        self.read_count
    }

    /// Tag identifier memory, present in every tag mode
    pub fn tid(&self) -> Option<&str> {
        self.tid.as_deref()
    }

    pub fn epc(&self) -> Option<&str> {
        self.epc.as_deref()
    }

    /// User memory, present in `EMBEDDED_ALL`
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn data_info(&self) -> Option<&str> {
        self.data_info.as_deref()
    }
}

impl fmt::Display for TagRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Group Name: {}", self.group_name)?;
        writeln!(f, "Reader Name: {}", self.reader_name)?;
        writeln!(f, "Mode/AlertType: {}", self.response_mode)?;
        writeln!(f, "Tag Num: {}", self.tag_number)?;
        writeln!(f, "Tag Size: {}", self.tag_size)?;
        writeln!(f, "Detectstat: {}", self.detect_status)?;
        writeln!(f, "Subzone: {}", self.subzone)?;
        writeln!(f, "RSSI: {}", self.rssi)?;
        writeln!(f, "UTC: {}", self.timestamp)?;
        writeln!(f, "Count: {}", self.read_count)?;
        if let Some(tid) = &self.tid {
            writeln!(f, "TID: {}", tid)?;
        }
        if let Some(epc) = &self.epc {
            writeln!(f, "EPC: {}", epc)?;
        }
        if let Some(user) = &self.user {
            writeln!(f, "USER: {}", user)?;
        }
        if let Some(data) = &self.data_info {
            writeln!(f, "Data Info: {}", data)?;
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(what: &str, field: &str) -> Result<T> {
    field
        .parse()
        .map_err(|_| ReaderError::Decode(format!("{} is not a number: {:?}", what, field)))
}
