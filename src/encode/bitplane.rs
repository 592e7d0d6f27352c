use crate::channel::table::{ChannelFlags, ChannelTable, ChannelType, MAX_CHANNELS, Protocol};
use crate::encode::charlieplex::{CharlieplexEncoder, NUM_LOADS};
use crate::foundation::color::{limit_brightness, max_component, swap_rg};
use crate::foundation::config::CanvasOpts;
use crate::foundation::error::{GpuPortError, GpuPortResult};

/// Frame-buffer columns: 3 video columns per WS281X data bit, 24 bits per node.
pub const WIDTH: usize = 3 * MAX_CHANNELS;

/// Columns handed to the display; the last one overlaps horizontal blanking.
pub const PRESENT_WIDTH: usize = WIDTH - 1;

/// Output rows per charlieplex controller page: config + checksum + list, 2 bytes per row.
pub const CHARLIEPLEX_PAGE_ROWS: usize = (2 + 3 * NUM_LOADS).div_ceil(2);

/// Bit 23 of a frame-buffer word; channel `x` lives at `CHANNEL0_BIT >> x`.
const CHANNEL0_BIT: u32 = 0x80_0000;

/// Second UART start bit, between the two data bytes of a charlieplex row.
const UART_MID_START: u32 = 0x800;

/// Encoder options derived from [`CanvasOpts`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncoderConfig {
    /// R+G+B ceiling for WS281X pixels; `None` disables limiting.
    pub max_brightness: Option<u16>,
    /// Copy raw colors instead of encoding (visual debugging only).
    pub dev_mode: bool,
}

impl From<&CanvasOpts> for EncoderConfig {
    fn from(opts: &CanvasOpts) -> Self {
        Self {
            max_brightness: opts.brightness_ceiling(),
            dev_mode: opts.dev_mode,
        }
    }
}

/// Outcome of one encode pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeReport {
    skipped: u32,
}

impl EncodeReport {
    /// Whether every configured channel was encoded.
    pub fn is_clean(&self) -> bool {
        self.skipped == 0
    }

    /// Channels whose bit-plane was left low because their type is not encodable.
    pub fn skipped_channels(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_CHANNELS).filter(|&x| self.skipped & (1 << x) != 0)
    }

    /// Bitmask of skipped channels (bit `x` for channel `x`).
    pub fn skipped_mask(&self) -> u32 {
        self.skipped
    }
}

/// An owned `WIDTH x height` frame buffer, as produced by [`SignalEncoder::encode_frame`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    height: usize,
    words: Vec<u32>,
}

impl FrameBuffer {
    /// Zeroed buffer of `height` rows.
    pub fn new(height: usize) -> Self {
        Self {
            height,
            words: vec![0; WIDTH * height],
        }
    }

    /// Always [`WIDTH`].
    pub fn width(&self) -> usize {
        WIDTH
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// All words, row-major with a pitch of [`WIDTH`].
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Mutable words, row-major with a pitch of [`WIDTH`].
    pub fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    /// Words of row `y`.
    pub fn row(&self, y: usize) -> &[u32] {
        &self.words[y * WIDTH..(y + 1) * WIDTH]
    }

    /// Output level of `channel` across the 72 columns of row `y`.
    ///
    /// # Panics
    ///
    /// When `channel >= MAX_CHANNELS` or `y >= height`.
    pub fn plane_row(&self, channel: usize, y: usize) -> [bool; WIDTH] {
        assert!(
            channel < MAX_CHANNELS,
            "channel {channel} out of range (max {MAX_CHANNELS})"
        );
        let mask = CHANNEL0_BIT >> channel;
        let mut out = [false; WIDTH];
        for (bit, word) in out.iter_mut().zip(self.row(y)) {
            *bit = word & mask != 0;
        }
        out
    }

    /// Expand to RGBA8 bytes (alpha forced opaque) for image output.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.words.len() * 4);
        for &w in &self.words {
            out.extend_from_slice(&[(w >> 16) as u8, (w >> 8) as u8, w as u8, 0xFF]);
        }
        out
    }
}

#[derive(Clone, Copy, Debug)]
enum ChannelPlan {
    Skip,
    Ws281x { rg_swap: bool },
    Charlieplex { config_byte: u8 },
}

/// Converts a column-major pixel matrix into a bit-plane frame buffer.
///
/// Owns the per-channel charlieplex encoders; they are created and dropped as channel
/// protocols change.
#[derive(Debug)]
pub struct SignalEncoder {
    node_length: usize,
    config: EncoderConfig,
    table: ChannelTable,
    charlieplex: Vec<Option<Box<CharlieplexEncoder>>>,
    page_values: [u8; NUM_LOADS],
}

impl SignalEncoder {
    /// Encoder for `num_channels` channels of `node_length` nodes, all initially unused.
    pub fn new(
        num_channels: usize,
        node_length: usize,
        config: EncoderConfig,
    ) -> GpuPortResult<Self> {
        let table = ChannelTable::new(num_channels)?;
        if node_length == 0 {
            return Err(GpuPortError::config("node_length must be > 0"));
        }
        Ok(Self {
            node_length,
            config,
            table,
            charlieplex: vec![None; num_channels],
            page_values: [0; NUM_LOADS],
        })
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.table.len()
    }

    /// Nodes per channel (= frame-buffer rows).
    pub fn node_length(&self) -> usize {
        self.node_length
    }

    /// Active options.
    pub fn config(&self) -> EncoderConfig {
        self.config
    }

    /// Descriptor of channel `index`, `None` when out of range.
    pub fn channel_type(&self, index: usize) -> Option<ChannelType> {
        self.table.get(index)
    }

    /// Replace the descriptor of channel `index`, returning the previous one.
    ///
    /// Moving into or out of [`Protocol::CharlieplexSsr`] creates or drops that channel's
    /// dimming encoder; flag-only changes keep it.
    pub fn set_channel_type(&mut self, index: usize, new_type: ChannelType) -> Option<ChannelType> {
        self.retype(index, new_type, &mut Vec::new())
    }

    /// Bring every channel in line with `table` (entries past our channel count are ignored).
    ///
    /// Channels entering charlieplex take their encoder from `spares` before allocating one;
    /// encoders of channels leaving it are handed back while `spares` has spare capacity.
    pub fn sync_table(
        &mut self,
        table: &ChannelTable,
        spares: &mut Vec<Box<CharlieplexEncoder>>,
    ) {
        for (index, t) in table.iter().enumerate().take(self.num_channels()) {
            if self.table.get(index) != Some(t) {
                self.retype(index, t, spares);
            }
        }
    }

    fn retype(
        &mut self,
        index: usize,
        new_type: ChannelType,
        spares: &mut Vec<Box<CharlieplexEncoder>>,
    ) -> Option<ChannelType> {
        let previous = self.table.set(index, new_type)?;
        let was = previous.protocol == Protocol::CharlieplexSsr;
        let is = new_type.protocol == Protocol::CharlieplexSsr;
        if is && !was {
            self.charlieplex[index] = Some(spares.pop().unwrap_or_default());
        } else if was
            && !is
            && let Some(enc) = self.charlieplex[index].take()
            && spares.len() < spares.capacity()
        {
            spares.push(enc);
        }
        Some(previous)
    }

    /// Whether channel `index` currently owns a charlieplex encoder.
    pub fn has_charlieplex_encoder(&self, index: usize) -> bool {
        matches!(self.charlieplex.get(index), Some(Some(_)))
    }

    /// Encode `pixels` into `dest`, a surface of `node_length` rows at `pitch` words per row.
    ///
    /// `pixels` holds `num_channels * node_length` ARGB colors, channel-major. Only the first
    /// [`WIDTH`] words of each row are written. Channels with a non-encodable type are left
    /// low and reported; the rest still encode.
    pub fn encode(
        &mut self,
        pixels: &[u32],
        dest: &mut [u32],
        pitch: usize,
    ) -> GpuPortResult<EncodeReport> {
        let (num_channels, height) = (self.num_channels(), self.node_length);
        if pixels.len() != num_channels * height {
            return Err(GpuPortError::config(format!(
                "pixel array has {} entries, expected {num_channels} x {height}",
                pixels.len()
            )));
        }
        if pitch < WIDTH {
            return Err(GpuPortError::config(format!(
                "surface pitch {pitch} is narrower than {WIDTH}"
            )));
        }
        let needed = pitch * (height - 1) + WIDTH;
        if dest.len() < needed {
            return Err(GpuPortError::config(format!(
                "surface holds {} words, need {needed}",
                dest.len()
            )));
        }

        if self.config.dev_mode {
            self.copy_raw(pixels, dest, pitch);
            return Ok(EncodeReport::default());
        }

        let mut report = EncodeReport::default();
        let mut plans = [ChannelPlan::Skip; MAX_CHANNELS];
        for (x, plan) in plans.iter_mut().enumerate().take(num_channels) {
            let t = self.table.get(x).unwrap_or(ChannelType::NONE);
            *plan = if !t.is_encodable() {
                report.skipped |= 1 << x;
                ChannelPlan::Skip
            } else if t.protocol == Protocol::Ws281x {
                ChannelPlan::Ws281x {
                    rg_swap: t.flags.contains(ChannelFlags::RG_SWAP),
                }
            } else if self.has_charlieplex_encoder(x) {
                ChannelPlan::Charlieplex {
                    config_byte: t.to_byte(),
                }
            } else {
                report.skipped |= 1 << x;
                ChannelPlan::Skip
            };
        }

        for y in 0..height {
            let row = &mut dest[y * pitch..y * pitch + WIDTH];
            row.fill(0);
            let page_ofs = y % CHARLIEPLEX_PAGE_ROWS;
            for (x, plan) in plans.iter().enumerate().take(num_channels) {
                let column = &pixels[x * height..(x + 1) * height];
                match *plan {
                    ChannelPlan::Skip => {}
                    ChannelPlan::Ws281x { rg_swap } => {
                        let mut color = column[y];
                        if rg_swap {
                            color = swap_rg(color);
                        }
                        if let Some(ceiling) = self.config.max_brightness {
                            color = limit_brightness(color, ceiling);
                        }
                        write_ws281x(row, x, color);
                    }
                    ChannelPlan::Charlieplex { config_byte } => {
                        let Some(enc) = self.charlieplex[x].as_deref_mut() else {
                            continue;
                        };
                        if page_ofs == 0 {
                            let first = y / CHARLIEPLEX_PAGE_ROWS * NUM_LOADS;
                            self.page_values.fill(0);
                            let nodes = column.iter().skip(first).take(NUM_LOADS);
                            for (slot, &color) in self.page_values.iter_mut().zip(nodes) {
                                *slot = max_component(color);
                            }
                            enc.insert_all(&self.page_values);
                            enc.resolve_conflicts();
                        }
                        let (even, odd) = enc.page_bytes(page_ofs, config_byte);
                        write_uart_pair(row, x, even, odd);
                    }
                }
            }
        }
        Ok(report)
    }

    /// Encode into a freshly allocated [`FrameBuffer`].
    pub fn encode_frame(&mut self, pixels: &[u32]) -> GpuPortResult<(FrameBuffer, EncodeReport)> {
        let mut frame = FrameBuffer::new(self.node_length);
        let report = self.encode(pixels, frame.words_mut(), WIDTH)?;
        Ok((frame, report))
    }

    fn copy_raw(&self, pixels: &[u32], dest: &mut [u32], pitch: usize) {
        let (num_channels, height) = (self.num_channels(), self.node_length);
        for y in 0..height {
            let row = &mut dest[y * pitch..y * pitch + WIDTH];
            row.fill(0);
            for x in 0..num_channels {
                let mut color = pixels[x * height + y];
                let swap = self
                    .table
                    .get(x)
                    .is_some_and(|t| t.flags.contains(ChannelFlags::RG_SWAP));
                if swap {
                    color = swap_rg(color);
                }
                row[3 * x..3 * x + 3].fill(color);
            }
        }
    }
}

/// One WS281X node: per bit, a start pulse, the data level, then low.
fn write_ws281x(row: &mut [u32], channel: usize, color: u32) {
    let mask = CHANNEL0_BIT >> channel;
    for (bit, cols) in row.chunks_exact_mut(3).enumerate() {
        cols[0] |= mask;
        if color & (CHANNEL0_BIT >> bit) != 0 {
            cols[1] |= mask;
        }
    }
}

/// Two UART bytes with inverted start/stop bits, each bit 3 columns wide.
fn write_uart_pair(row: &mut [u32], channel: usize, even: u8, odd: u8) {
    let mask = CHANNEL0_BIT >> channel;
    let word = CHANNEL0_BIT | (u32::from(even) << 15) | UART_MID_START | (u32::from(odd) << 3);
    for (bit, cols) in row.chunks_exact_mut(3).enumerate() {
        if word & (CHANNEL0_BIT >> bit) != 0 {
            for c in cols {
                *c |= mask;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/bitplane.rs"]
mod tests;
