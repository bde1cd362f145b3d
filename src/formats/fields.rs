use std::ops::Range;

/// Tab-delimited fields of one line, split lazily.
///
/// Only the columns up to the highest one requested are ever scanned, and
/// boundaries found once are cached.
pub struct Fields<'a> {
    line: &'a str,
    bounds: Vec<Range<usize>>,
    pos: usize,
    exhausted: bool,
}

impl<'a> Fields<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            line,
            bounds: Vec::new(),
            pos: 0,
            exhausted: false,
        }
    }

    pub fn get(&mut self, i: usize) -> Option<&'a str> {
        while self.bounds.len() <= i && !self.exhausted {
            match self.line[self.pos..].find('\t') {
                Some(n) => {
                    self.bounds.push(self.pos..self.pos + n);
                    self.pos += n + 1;
                }
                None => {
                    self.bounds.push(self.pos..self.line.len());
                    self.exhausted = true;
                }
            }
        }

        let line = self.line;
        self.bounds.get(i).map(|range| &line[range.clone()])
    }

    /// Number of columns scanned so far.
    pub fn scanned(&self) -> usize {
        self.bounds.len()
    }
}
