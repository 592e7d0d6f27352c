//! Phase-angle dimming display lists for charlieplexed SSR banks.
//!
//! A bank of [`NUM_WIRES`] wires addresses [`NUM_LOADS`] loads as (row, col) pairs with
//! `row != col`. Each load switches on at a delay slot counted from minimum brightness and
//! stays on until the next refresh, so a larger value means a brighter load. Loads sharing
//! one brightness share one entry; an entry spanning several rows gets its rows spread over
//! adjacent delay slots so that every transmitted row has a slot of its own.
//!
//! The serialized list is a sequence of `(lead, row_map, col_map)` triples. `lead` counts
//! down from 256: the first triple's lead is `256 - delay`, later triples carry the distance
//! from the previous row's slot (`1` for rows of the same entry). A zero lead ends the list.

/// Wires in one charlieplexed bank.
pub const NUM_WIRES: usize = 8;

/// Addressable loads: every (row, col) pair except the diagonal.
pub const NUM_LOADS: usize = NUM_WIRES * (NUM_WIRES - 1);

/// Capacity of the serialized display list in bytes.
pub const DISPLAY_LIST_LEN: usize = 3 * NUM_LOADS;

const RAW_ADDRESSES: usize = NUM_WIRES * NUM_WIRES;

/// Row and column of the `index`-th non-diagonal load, enumerated row-major.
pub fn load_address(index: usize) -> Option<(u8, u8)> {
    if index >= NUM_LOADS {
        return None;
    }
    let row = index / (NUM_WIRES - 1);
    let mut col = index % (NUM_WIRES - 1);
    if col >= row {
        col += 1;
    }
    Some((row as u8, col as u8))
}

const fn wire_bit(wire: usize) -> u8 {
    0x80 >> wire
}

/// Loads sharing one brightness value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DimRowEntry {
    /// Brightness before conflict resolution, resolved delay afterwards.
    pub delay: u8,
    /// Number of rows with at least one column set.
    pub num_rows: u8,
    /// Column bitmap (`0x80 >> col`) for each row.
    pub col_maps: [u8; NUM_WIRES],
}

impl DimRowEntry {
    /// Bitmap (`0x80 >> row`) of rows used by this entry.
    pub fn row_map(&self) -> u8 {
        self.col_maps
            .iter()
            .enumerate()
            .filter(|(_, cols)| **cols != 0)
            .fold(0, |acc, (row, _)| acc | wire_bit(row))
    }
}

/// One decoded row of a display list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayRow {
    /// Effective switch-on delay of the row.
    pub delay: u8,
    /// Row index (0..8).
    pub row: u8,
    /// Column bitmap for the row.
    pub col_map: u8,
}

/// Builds the per-page dimming display list of one charlieplexed channel.
#[derive(Clone, Debug)]
pub struct CharlieplexEncoder {
    entries: [DimRowEntry; NUM_LOADS],
    sorted: [u8; NUM_LOADS],
    count: usize,
    total_rows: usize,
    address: usize,
    display: [u8; DISPLAY_LIST_LEN],
    display_len: usize,
    checksum: u8,
}

impl Default for CharlieplexEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CharlieplexEncoder {
    /// Encoder with an empty list.
    pub fn new() -> Self {
        Self {
            entries: [DimRowEntry::default(); NUM_LOADS],
            sorted: [0; NUM_LOADS],
            count: 0,
            total_rows: 0,
            address: 0,
            display: [0; DISPLAY_LIST_LEN],
            display_len: 0,
            checksum: 0,
        }
    }

    /// Start a new aggregation cycle at load address 0.
    pub fn init_list(&mut self) {
        self.count = 0;
        self.total_rows = 0;
        self.address = 0;
    }

    /// Add the brightness of the next load.
    ///
    /// Diagonal addresses are stepped over without consuming a value. Zero means "off" and
    /// only advances the address.
    pub fn insert(&mut self, value: u8) {
        while self.address < RAW_ADDRESSES && self.address / NUM_WIRES == self.address % NUM_WIRES
        {
            self.address += 1;
        }
        if self.address >= RAW_ADDRESSES {
            tracing::warn!(value, "charlieplex list overflow, value dropped");
            return;
        }
        let (row, col) = (self.address / NUM_WIRES, self.address % NUM_WIRES);
        self.address += 1;
        if value == 0 {
            return;
        }

        let entries = &self.entries;
        let found = self.sorted[..self.count]
            .binary_search_by(|&i| entries[usize::from(i)].delay.cmp(&value).reverse());
        match found {
            Ok(pos) => {
                let entry = &mut self.entries[usize::from(self.sorted[pos])];
                if entry.col_maps[row] == 0 {
                    entry.num_rows += 1;
                    self.total_rows += 1;
                }
                entry.col_maps[row] |= wire_bit(col);
            }
            Err(pos) => {
                let slot = self.count;
                let mut col_maps = [0; NUM_WIRES];
                col_maps[row] = wire_bit(col);
                self.entries[slot] = DimRowEntry {
                    delay: value,
                    num_rows: 1,
                    col_maps,
                };
                self.sorted.copy_within(pos..self.count, pos + 1);
                self.sorted[pos] = slot as u8;
                self.count += 1;
                self.total_rows += 1;
            }
        }
    }

    /// Start a new cycle and insert up to [`NUM_LOADS`] brightness values.
    pub fn insert_all(&mut self, values: &[u8]) {
        self.init_list();
        if values.len() > NUM_LOADS {
            tracing::trace!(
                extra = values.len() - NUM_LOADS,
                "ignoring values past the last load"
            );
        }
        for &v in values.iter().take(NUM_LOADS) {
            self.insert(v);
        }
    }

    /// Assign each entry a delay range and serialize the display list.
    ///
    /// Walking from brightest to dimmest, an entry with `n` rows is shifted up by
    /// `(n - 1) / 2` so its rows straddle the nominal brightness, then clamped so its range
    /// stays below the previous entry (`max`) and leaves room for every dimmer row (`min`).
    pub fn resolve_conflicts(&mut self) {
        self.display_len = 0;
        self.checksum = 0;
        let mut max: i32 = 255;
        let mut min = self.total_rows as i32;

        for i in 0..self.count {
            let idx = usize::from(self.sorted[i]);
            let entry = self.entries[idx];
            let rows = i32::from(entry.num_rows);
            let delay = i32::from(entry.delay);
            min -= rows;

            let mut adjust = (rows - 1) / 2;
            if delay + adjust > max {
                adjust = max - delay;
            } else if delay + adjust - rows < min {
                adjust = min - (delay - rows);
            }
            let resolved = (delay + adjust).clamp(0, 255);
            self.entries[idx].delay = resolved as u8;

            let mut lead = (max - resolved + 1).clamp(1, 255) as u8;
            for (row, &cols) in entry.col_maps.iter().enumerate() {
                if cols == 0 {
                    continue;
                }
                self.push_triple(lead, wire_bit(row), cols);
                lead = 1;
            }
            max = resolved - rows;
        }
        self.display[self.display_len..].fill(0);
        tracing::trace!(
            entries = self.count,
            rows = self.total_rows,
            checksum = self.checksum,
            "charlieplex display list resolved"
        );
    }

    fn push_triple(&mut self, lead: u8, row_map: u8, col_map: u8) {
        for byte in [lead, row_map, col_map] {
            self.display[self.display_len] = byte;
            self.checksum ^= byte;
            self.display_len += 1;
        }
    }

    /// Insert a full cycle and resolve it in one step.
    pub fn encode(&mut self, values: &[u8]) -> &[u8; DISPLAY_LIST_LEN] {
        self.insert_all(values);
        self.resolve_conflicts();
        &self.display
    }

    /// Entries from brightest to dimmest.
    pub fn entries(&self) -> impl Iterator<Item = &DimRowEntry> + '_ {
        self.sorted[..self.count]
            .iter()
            .map(|&i| &self.entries[usize::from(i)])
    }

    /// Rows used across all entries (one per display-list triple).
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Serialized list, zero-filled past [`display_len`](Self::display_len).
    pub fn display_list(&self) -> &[u8; DISPLAY_LIST_LEN] {
        &self.display
    }

    /// Bytes of the display list in use.
    pub fn display_len(&self) -> usize {
        self.display_len
    }

    /// XOR of every emitted display-list byte.
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Byte pair sent on output row `row_ofs` of a page.
    ///
    /// Row 0 carries the channel type byte and the checksum folded with it; row `k` carries
    /// list bytes `2k - 2` and `2k - 1`. Rows past the list read as zero.
    pub fn page_bytes(&self, row_ofs: usize, config_byte: u8) -> (u8, u8) {
        if row_ofs == 0 {
            return (config_byte, self.checksum ^ config_byte);
        }
        let at = |i: usize| self.display.get(i).copied().unwrap_or(0);
        (at(2 * row_ofs - 2), at(2 * row_ofs - 1))
    }
}

/// Expand a serialized list back into per-row delays, stopping at the first zero lead.
pub fn decode_display_list(list: &[u8]) -> Vec<DisplayRow> {
    let mut rows = Vec::new();
    let mut dim: i32 = 256;
    for triple in list.chunks_exact(3) {
        if triple[0] == 0 {
            break;
        }
        dim -= i32::from(triple[0]);
        rows.push(DisplayRow {
            delay: dim.clamp(0, 255) as u8,
            row: triple[1].leading_zeros() as u8,
            col_map: triple[2],
        });
    }
    rows
}

#[cfg(test)]
#[path = "../../tests/unit/encode/charlieplex.rs"]
mod tests;
