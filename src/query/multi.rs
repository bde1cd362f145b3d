use super::offsets::VirtualOffsetSet;
use crate::formats::{Extractor, HeaderFilter, PositionExtractor};
use crate::index::{Index, ReferenceNames};
use crate::io::{BlockStream, LineReader};
use crate::types::Region;
use crate::{Error, Result};
use noodles::bgzf::VirtualPosition;

/// Double-fetched records between two progress warnings.
const DOUBLE_FETCH_WARN_INTERVAL: u64 = 100_000;

/// A range of the sorted offset set, bound to its region's sequence id.
#[derive(Debug, Clone)]
struct ScanRange {
    begin: VirtualPosition,
    end: VirtualPosition,
    region: Region,
    reference_id: usize,
}

/// A data line read ahead of the range currently being served.
#[derive(Debug, Clone)]
struct Record {
    text: String,
    offset: VirtualPosition,
    reference_id: usize,
    start: u64,
    end: u64,
}

/// Streams the lines overlapping several regions through one reader.
///
/// Ranges are visited in offset order. Records that overlapping regions
/// would return twice are skipped and counted as double-fetched.
pub struct MultiRegionQuery<S> {
    reader: LineReader<S>,
    names: ReferenceNames,
    extractor: Extractor,
    headers: HeaderFilter,
    ranges: Vec<ScanRange>,
    current: usize,
    entered: bool,
    // highest start returned by earlier ranges of the current sequence
    previous_start: Option<u64>,
    highest_start: Option<u64>,
    reached_reference: bool,
    pending: Option<Record>,
    double_fetched: u64,
    reported: bool,
}

impl<S> MultiRegionQuery<S>
where
    S: BlockStream,
{
    /// Resolves `regions` against `index` and prepares a sorted scan.
    ///
    /// Regions on sequences missing from the index contribute nothing.
    pub fn new(reader: LineReader<S>, index: &Index, regions: &[Region]) -> Result<Self> {
        let mut offsets = VirtualOffsetSet::from_regions(index, regions);
        offsets.sort();
        Self::from_offsets(reader, index, offsets)
    }

    /// Scans an already sorted offset set; every entry needs a region.
    pub fn from_offsets(reader: LineReader<S>, index: &Index, offsets: VirtualOffsetSet) -> Result<Self> {
        let names = index.header().names.clone();

        let ranges = offsets
            .into_iter()
            .map(|entry| {
                let region = entry.region.ok_or_else(|| {
                    Error::InvalidInput("multi-region scans need a region for every range".to_string())
                })?;
                let reference_id = names.get(&region.reference_name).ok_or_else(|| {
                    Error::InvalidInput(format!("{} is not in the index", region.reference_name))
                })?;
                Ok(ScanRange {
                    begin: entry.begin,
                    end: entry.end,
                    region,
                    reference_id,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Scanning {} ranges", ranges.len());

        let options = &index.header().options;
        Ok(Self {
            reader,
            names,
            extractor: Extractor::new(options),
            headers: HeaderFilter::new(options),
            ranges,
            current: 0,
            entered: false,
            previous_start: None,
            highest_start: None,
            reached_reference: false,
            pending: None,
            double_fetched: 0,
            reported: false,
        })
    }

    /// Records skipped so far because an earlier range already returned them.
    pub fn double_fetched(&self) -> u64 {
        self.double_fetched
    }

    /// Ends the scan, returning the double-fetch count.
    pub fn close(mut self) -> u64 {
        self.report();
        self.double_fetched
    }

    /// Returns the next matching line, or `None` once every range is done.
    pub fn read_record(&mut self) -> Result<Option<String>> {
        loop {
            if self.current >= self.ranges.len() {
                return Ok(None);
            }

            if !self.entered {
                self.enter_range()?;
            }

            let record = match self.pending.take() {
                Some(record) => record,
                None => match self.read_next()? {
                    Some(record) => record,
                    None => {
                        self.advance();
                        continue;
                    }
                },
            };

            let range = &self.ranges[self.current];
            let (range_end, reference_id) = (range.end, range.reference_id);
            let (region_begin, region_end) = (range.region.begin(), range.region.end);

            if record.offset >= range_end || record.reference_id > reference_id {
                self.pending = Some(record);
                self.advance();
                continue;
            }

            if record.reference_id < reference_id {
                // a block may start with the tail of the previous sequence
                if self.reached_reference {
                    return Err(Error::Format(format!(
                        "data file is not sorted: {} at {:?} follows {}",
                        self.names.name(record.reference_id).unwrap_or_default(),
                        record.offset,
                        self.names.name(reference_id).unwrap_or_default()
                    )));
                }
                continue;
            }
            self.reached_reference = true;

            if record.end <= region_begin {
                continue;
            }

            if self.previous_start.is_some_and(|previous| record.start <= previous) {
                self.double_fetched += 1;
                if self.double_fetched % DOUBLE_FETCH_WARN_INTERVAL == 0 {
                    tracing::warn!(
                        "{} records fetched more than once by overlapping regions",
                        self.double_fetched
                    );
                }
                continue;
            }

            if region_end.is_some_and(|end| record.start >= end) {
                self.pending = Some(record);
                self.advance();
                continue;
            }

            self.highest_start = self.highest_start.max(Some(record.start));
            return Ok(Some(record.text));
        }
    }

    fn enter_range(&mut self) -> Result<()> {
        let begin = self.ranges[self.current].begin;

        // a record at or past the range start will be read again
        if self.pending.as_ref().is_some_and(|record| record.offset >= begin) {
            self.pending = None;
        }

        if self.reader.next_line_offset() != begin {
            tracing::debug!("Seeking to {:?}", begin);
            self.reader.seek(begin)?;
        }

        self.entered = true;
        Ok(())
    }

    fn advance(&mut self) {
        let finished = self.ranges[self.current].reference_id;
        let next = self.current + 1;

        self.previous_start = match self.ranges.get(next) {
            Some(range) if range.reference_id == finished => self.previous_start.max(self.highest_start),
            _ => None,
        };

        self.highest_start = None;
        self.reached_reference = false;
        self.current = next;
        self.entered = false;
    }

    fn read_next(&mut self) -> Result<Option<Record>> {
        while let Some(line) = self.reader.read_located()? {
            if self.headers.is_meta(line.text) {
                continue;
            }

            let Some(position) = self.extractor.extract(line.text)? else {
                continue;
            };

            let reference_id = self.names.get(position.reference_name).ok_or_else(|| {
                Error::IndexMismatch(format!(
                    "sequence {} is not in the index",
                    position.reference_name
                ))
            })?;

            return Ok(Some(Record {
                text: line.text.to_string(),
                offset: line.start,
                reference_id,
                start: position.start,
                end: position.end(),
            }));
        }

        Ok(None)
    }
}

impl<S> Iterator for MultiRegionQuery<S>
where
    S: BlockStream,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(line) => line.map(Ok),
            Err(e) => {
                self.current = self.ranges.len();
                Some(Err(e))
            }
        }
    }
}

impl<S> MultiRegionQuery<S> {
    /// Logs the final double-fetch count once; returns whether it logged.
    fn report(&mut self) -> bool {
        if self.reported || self.double_fetched == 0 {
            return false;
        }
        self.reported = true;

        tracing::warn!(
            "Skipped {} records already returned by an overlapping region",
            self.double_fetched
        );
        true
    }
}

impl<S> Drop for MultiRegionQuery<S> {
    fn drop(&mut self) {
        self.report();
    }
}
