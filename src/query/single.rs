use super::offsets::resolve;
use crate::formats::{Extractor, HeaderFilter, PositionExtractor};
use crate::index::Index;
use crate::io::{BlockStream, LineReader};
use crate::types::Region;
use crate::Result;
use noodles::bgzf::VirtualPosition;

/// Streams the lines overlapping one region, or every data line of the file.
///
/// The region is resolved to a single range spanning its first to last
/// chunk; the reader seeks once and scans until the range or the region is
/// exhausted.
pub struct SingleRegionQuery<S> {
    reader: LineReader<S>,
    extractor: Extractor,
    headers: HeaderFilter,
    region: Option<Region>,
    range_end: Option<VirtualPosition>,
    reached: bool,
    done: bool,
}

impl<S> SingleRegionQuery<S>
where
    S: BlockStream,
{
    /// Positions `reader` for `region`; `None` scans the whole file.
    ///
    /// A region on a sequence missing from the index yields no lines.
    pub fn new(mut reader: LineReader<S>, index: &Index, region: Option<&Region>) -> Result<Self> {
        let options = &index.header().options;
        let mut range_end = None;
        let mut done = false;

        match region {
            None => reader.seek(VirtualPosition::from(0))?,
            Some(region) => {
                let chunks = resolve(index, region).unwrap_or_default();
                match chunks.first().zip(chunks.last()) {
                    Some((first, last)) => {
                        tracing::debug!(
                            "Scanning {} from {:?} to {:?}",
                            region,
                            first.start(),
                            last.end()
                        );
                        reader.seek(first.start())?;
                        range_end = Some(last.end());
                    }
                    None => done = true,
                }
            }
        }

        Ok(Self {
            reader,
            extractor: Extractor::new(options),
            headers: HeaderFilter::new(options),
            region: region.cloned(),
            range_end,
            reached: false,
            done,
        })
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    /// Returns the next matching line, or `None` once the scan is over.
    pub fn read_record(&mut self) -> Result<Option<String>> {
        loop {
            if self.done {
                return Ok(None);
            }

            let Some(line) = self.reader.read_located()? else {
                self.done = true;
                return Ok(None);
            };

            let Some(region) = &self.region else {
                if self.headers.is_header(line.text) {
                    continue;
                }
                return Ok(Some(line.text.to_string()));
            };

            if self.range_end.is_some_and(|end| line.start >= end) {
                self.done = true;
                return Ok(None);
            }

            if self.headers.is_meta(line.text) {
                continue;
            }

            let Some(position) = self.extractor.extract(line.text)? else {
                continue;
            };

            if position.reference_name != region.reference_name {
                if self.reached {
                    self.done = true;
                    return Ok(None);
                }
                continue;
            }
            self.reached = true;

            if region.end.is_some_and(|end| position.start >= end) {
                self.done = true;
                return Ok(None);
            }

            if position.end() >= region.begin() {
                return Ok(Some(line.text.to_string()));
            }
        }
    }
}

impl<S> Iterator for SingleRegionQuery<S>
where
    S: BlockStream,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(line) => line.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
