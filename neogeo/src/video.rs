//! Video pipeline: VRAM window + register file, palette RAM with its RGB565
//! shadow, per-scanline sprite-list construction, sprite rasterization, and
//! the 8x8 fix-tile text layer.
//!
//! VRAM is word-addressed (little-endian on the wire, stored here as `u16`
//! directly) and is 68 KiB = 0x8800 words. The layout is fixed by hardware
//! (see the module constants below); sprite control blocks are read directly
//! by address from the raster path, while the bus-facing `VRAMADDR` /
//! `VRAMRW` / `VRAMMOD` trio is a cursor-based window used by everything
//! else (CPU writes, most reads).

/// Total VRAM size in 16-bit words.
pub const VRAM_WORDS: usize = 0x8800;

pub const SCB1_START: u16 = 0x0000;
pub const SCB1_END: u16 = 0x6FFF;
pub const FIXMAP_START: u16 = 0x7000;
pub const FIXMAP_END: u16 = 0x74FF;
pub const EXTENSION_START: u16 = 0x7500;
pub const EXTENSION_END: u16 = 0x7FFF;
pub const SCB2_START: u16 = 0x8000;
pub const SCB2_END: u16 = 0x81FF;
pub const SCB3_START: u16 = 0x8200;
pub const SCB3_END: u16 = 0x83FF;
pub const SCB4_START: u16 = 0x8400;
pub const SCB4_END: u16 = 0x85FF;
pub const SCRATCH_START: u16 = 0x8600;
pub const SCRATCH_END: u16 = 0x86FF;
pub const UNUSED_START: u16 = 0x8700;
pub const UNUSED_END: u16 = 0x87FF;

/// Hardware sprite count: SCB3 carries exactly 381 two-byte entries.
pub const SPRITE_COUNT: usize = 381;
/// Maximum sprites evaluated onto a single scanline.
pub const MAX_SPRITES_PER_LINE: usize = 96;

pub const FRAME_WIDTH: usize = 320;
pub const FRAME_HEIGHT: usize = 224;
/// Scanline at which the visible frame begins (16-line top overscan).
pub const VISIBLE_TOP_LINE: u16 = 16;
/// Scanline at which VBlank begins; also one past the last visible line.
pub const VBLANK_LINE: u16 = 240;

const TIMER_IRQ_BIT: u8 = 0x01;
const VBLANK_IRQ_BIT: u8 = 0x02;

pub const RELOAD_LOW_WRITE_MASK: u16 = 0x0001;
pub const RELOAD_FRAME_START_MASK: u16 = 0x0002;
pub const RELOAD_EMPTY_MASK: u16 = 0x0004;
pub const IRQ_ENABLED_MASK: u16 = 0x0008;

/// Raw VRAM backing store plus the cursor/auto-increment window onto it.
pub struct Vram {
    words: Vec<u16>,
}

impl Vram {
    pub fn new() -> Self {
        Self {
            words: vec![0u16; VRAM_WORDS],
        }
    }

    /// Addresses the raster reads directly never go through the cursor and
    /// always see real storage, including the "unused" region (mapped, just
    /// uninterpreted) but excluding nothing — direct addressing always hits
    /// backing storage if in range.
    pub fn peek(&self, addr: u16) -> u16 {
        self.words.get(addr as usize).copied().unwrap_or(0)
    }

    pub fn poke(&mut self, addr: u16, value: u16) {
        if let Some(slot) = self.words.get_mut(addr as usize) {
            *slot = value;
        }
    }

    /// Whether a cursor-driven access at `addr` actually mutates storage —
    /// false for the sprite-scanline scratchpad and anything past the end
    /// of the mapped window (the cursor still advances either way).
    fn is_storage_backed(addr: u16) -> bool {
        (addr as usize) < VRAM_WORDS && !(SCRATCH_START..=SCRATCH_END).contains(&addr)
    }
}

impl Default for Vram {
    fn default() -> Self {
        Self::new()
    }
}

/// The `VRAMADDR`/`VRAMRW`/`VRAMMOD`/`LSPCMODE`/timer register file.
pub struct VideoRegs {
    pub vram: Vram,
    cursor: u16,
    vram_mod: i16,
    timer_reload: i32,
    timer_counter: i32,
    timer_control: u16,
    pending_irq: u8,
    auto_anim_speed: u8,
    auto_anim_disable: bool,
    auto_anim_counter: u8,
    auto_anim_frame_counter: u8,
    scanline: u16,
}

impl VideoRegs {
    pub fn new() -> Self {
        Self {
            vram: Vram::new(),
            cursor: 0,
            vram_mod: 1,
            timer_reload: 0,
            timer_counter: 0,
            timer_control: 0,
            pending_irq: 0,
            auto_anim_speed: 0,
            auto_anim_disable: false,
            auto_anim_counter: 0,
            auto_anim_frame_counter: 0,
            scanline: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn write_vramaddr(&mut self, value: u16) {
        self.cursor = value;
    }

    pub fn read_vramaddr(&self) -> u16 {
        self.cursor
    }

    pub fn write_vrammod(&mut self, value: i16) {
        self.vram_mod = value;
    }

    pub fn read_vrammod(&self) -> i16 {
        self.vram_mod
    }

    fn advance_cursor(&mut self) {
        self.cursor = self.cursor.wrapping_add_signed(self.vram_mod);
    }

    /// `VRAMRW` write: stores at the cursor (if the cursor lands on real
    /// storage) then advances by `VRAMMOD`, wrapping at 16 bits.
    pub fn write_vramrw(&mut self, value: u16) {
        if Vram::is_storage_backed(self.cursor) {
            self.vram.poke(self.cursor, value);
        }
        self.advance_cursor();
    }

    /// `VRAMRW` read: same cursor semantics, returning 0 for unbacked
    /// addresses.
    pub fn read_vramrw(&mut self) -> u16 {
        let value = if Vram::is_storage_backed(self.cursor) {
            self.vram.peek(self.cursor)
        } else {
            0
        };
        self.advance_cursor();
        value
    }

    pub fn write_timerlow(&mut self, value: u16) {
        self.timer_reload = (self.timer_reload & !0xFFFF) | value as i32;
        if self.timer_control & RELOAD_LOW_WRITE_MASK != 0 {
            self.timer_counter = self.timer_reload;
        }
    }

    pub fn write_timerhigh(&mut self, value: u16) {
        self.timer_reload = (self.timer_reload & 0xFFFF) | ((value as i32) << 16);
    }

    pub fn write_timer_control(&mut self, value: u16) {
        self.timer_control = value;
    }

    pub fn write_timerstop(&mut self, _value: u16) {
        self.timer_control &= !IRQ_ENABLED_MASK;
    }

    /// `IRQACK` write: clears the corresponding bits of the pending-IRQ mask.
    pub fn write_irqack(&mut self, value: u8) {
        self.pending_irq &= !value;
    }

    pub fn timer_irq_pending(&self) -> bool {
        self.pending_irq & TIMER_IRQ_BIT != 0
    }

    pub fn vblank_irq_pending(&self) -> bool {
        self.pending_irq & VBLANK_IRQ_BIT != 0
    }

    /// Advance the scanline timer by `pixels` pixel-clocks; fires the
    /// timer-IRQ (if enabled) when the down-counter crosses zero.
    pub fn tick_scanline_timer(&mut self, pixels: i32) {
        self.timer_counter -= pixels;
        if self.timer_counter <= 0 {
            if self.timer_control & IRQ_ENABLED_MASK != 0 {
                self.pending_irq |= TIMER_IRQ_BIT;
            }
            if self.timer_control & RELOAD_EMPTY_MASK != 0 {
                self.timer_counter += self.timer_reload.max(1);
            }
        }
    }

    /// Called once at scanline `VBLANK_LINE`: raises the VBlank IRQ,
    /// advances auto-animation, and optionally reloads the scanline timer.
    pub fn on_vblank(&mut self) {
        self.pending_irq |= VBLANK_IRQ_BIT;
        if self.timer_control & RELOAD_FRAME_START_MASK != 0 {
            self.timer_counter = self.timer_reload;
        }
        if !self.auto_anim_disable {
            if self.auto_anim_frame_counter >= self.auto_anim_speed {
                self.auto_anim_frame_counter = 0;
                self.auto_anim_counter = (self.auto_anim_counter + 1) & 0x07;
            } else {
                self.auto_anim_frame_counter += 1;
            }
        }
    }

    pub fn set_scanline(&mut self, scanline: u16) {
        self.scanline = scanline;
    }

    pub fn write_auto_anim_control(&mut self, speed: u8, disable: bool) {
        self.auto_anim_speed = speed;
        self.auto_anim_disable = disable;
    }

    /// `LSPCMODE` read: scanline in the top 9 bits, a fixed screen-frequency
    /// bit, and the low 3 bits of the auto-animation counter.
    pub fn read_lspcmode(&self) -> u16 {
        ((self.scanline & 0x1FF) << 7) | 0x0040 | (self.auto_anim_counter as u16 & 0x07)
    }
}

impl Default for VideoRegs {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteBank {
    A,
    B,
}

/// Total colors per bank: 256 palettes of 16 colors each.
pub const PALETTE_COLORS: usize = 4096;
/// Index of the backdrop color within whichever bank is current.
pub const BACKDROP_COLOR_INDEX: usize = PALETTE_COLORS - 1;

/// Dual-bank palette RAM plus its precomputed RGB565 shadow.
pub struct PaletteRam {
    raw: [[u16; PALETTE_COLORS]; 2],
    shadow: [[u16; PALETTE_COLORS]; 2],
}

impl PaletteRam {
    pub fn new() -> Self {
        Self {
            raw: [[0u16; PALETTE_COLORS]; 2],
            shadow: [[0u16; PALETTE_COLORS]; 2],
        }
    }

    fn bank_index(bank: PaletteBank) -> usize {
        match bank {
            PaletteBank::A => 0,
            PaletteBank::B => 1,
        }
    }

    pub fn write(&mut self, bank: PaletteBank, index: usize, value: u16) {
        let b = Self::bank_index(bank);
        if index < PALETTE_COLORS {
            self.raw[b][index] = value;
            self.shadow[b][index] = word_to_rgb565(value);
        }
    }

    pub fn read_raw(&self, bank: PaletteBank, index: usize) -> u16 {
        self.raw[Self::bank_index(bank)].get(index).copied().unwrap_or(0)
    }

    pub fn read_rgb565(&self, bank: PaletteBank, index: usize) -> u16 {
        self.shadow[Self::bank_index(bank)].get(index).copied().unwrap_or(0)
    }

    pub fn backdrop_rgb565(&self, bank: PaletteBank) -> u16 {
        self.read_rgb565(bank, BACKDROP_COLOR_INDEX)
    }
}

impl Default for PaletteRam {
    fn default() -> Self {
        Self::new()
    }
}

/// Unpack a hardware palette word (`DB | R4..R0 | G4..G0 | B4..B0`) into
/// RGB565, darkening all three channels when the shared dark bit is set.
/// The reference engine leaves the dark bit unimplemented; this crate
/// chooses to honor it (see DESIGN.md) since it is cheap once the 5-bit
/// fields are already unpacked.
fn word_to_rgb565(word: u16) -> u16 {
    let dark = (word >> 15) & 1 != 0;
    let mut r = ((word >> 10) & 0x1F) as u16;
    let mut g = ((word >> 5) & 0x1F) as u16;
    let mut b = (word & 0x1F) as u16;
    if dark {
        r >>= 1;
        g >>= 1;
        b >>= 1;
    }
    let g6 = (g << 1) | (g >> 4);
    (r << 11) | (g6 << 5) | b
}

/// A sprite slot selected onto a given scanline, resolved from its sticky
/// chain and control blocks.
#[derive(Debug, Clone, Copy)]
struct SpriteOnLine {
    index: u16,
    y: u16,
    zoom_x: u8,
    zoom_y: u8,
    vertical_size: u8,
    x: u16,
}

/// Walk all sprites' sticky chain and collect the ones visible on
/// `scanline`, in list order (painting order — first entry wins).
fn build_sprite_list(scanline: u16, vram: &Vram) -> Vec<SpriteOnLine> {
    let mut list = Vec::new();
    // Sticky bit on the first slot reuses these implicit defaults.
    let mut prev_y: u16 = 0;
    let mut prev_zoom_y: u8 = 255;
    let mut prev_vertical_size: u8 = 32;
    let mut prev_x: u16 = 0;
    let mut prev_zoom_x: u8 = 0;

    for i in 0..SPRITE_COUNT as u16 {
        let scb3 = vram.peek(SCB3_START + i);
        let sticky = scb3 & 0x40 != 0;
        let scb2 = vram.peek(SCB2_START + i);
        let zoom_x = ((scb2 >> 8) & 0xF) as u8;

        let (y, zoom_y, vertical_size) = if sticky {
            (prev_y, prev_zoom_y, prev_vertical_size)
        } else {
            let y = (496i32 - (((scb3 >> 7) & 0x1FF) as i32) + 16).rem_euclid(512) as u16;
            let vertical_size = (scb3 & 0x3F) as u8;
            let zoom_y = (scb2 & 0xFF) as u8;
            (y, zoom_y, vertical_size)
        };

        let x = if sticky {
            (prev_x + prev_zoom_x as u16 + 1) & 0x1FF
        } else {
            let scb4 = vram.peek(SCB4_START + i);
            (scb4 >> 7) & 0x1FF
        };

        prev_y = y;
        prev_zoom_y = zoom_y;
        prev_vertical_size = vertical_size;
        prev_x = x;
        prev_zoom_x = zoom_x;

        let rel = ((scanline as i32) - (y as i32)).rem_euclid(512);
        let on = vertical_size != 0 && (vertical_size >= 32 || rel < (vertical_size as i32) * 16);
        if on && list.len() < MAX_SPRITES_PER_LINE {
            list.push(SpriteOnLine {
                index: i,
                y,
                zoom_x,
                zoom_y,
                vertical_size,
                x,
            });
        }
    }
    list
}

/// Decimate 16 source pixels down to `zoom+1` kept columns, matching the
/// hardware's X-shrink behavior (`zoom=0` keeps exactly one column, `zoom=15`
/// keeps all sixteen).
fn shrink_keep(zoom: u8, i: u8) -> bool {
    let z = zoom as u32 + 1;
    let i = i as u32;
    ((i + 1) * z) / 16 > (i * z) / 16
}

/// Sprite rasterization context: the ROM tables and palette the raster reads
/// from, gathered so `render_scanline` isn't a ten-argument function.
pub struct RasterSources<'a> {
    pub y_zoom_rom: &'a [u8],
    pub c_rom: &'a [u8],
    pub s_rom: &'a [u8],
    pub palette: &'a PaletteRam,
    pub palette_bank: PaletteBank,
    /// Current 3-bit auto-animation counter (`VideoRegs`'s own state);
    /// substituted into the low bits of a sprite's tile index when its
    /// control word requests 4- or 8-frame auto-anim.
    pub auto_anim_counter: u8,
}

/// Render one scanline into `frame_buffer` (320x224 RGB565, row-major).
/// `frame_buffer` is untouched for scanlines outside `[VISIBLE_TOP_LINE,
/// VBLANK_LINE)`.
pub fn render_scanline(
    scanline: u16,
    vram: &Vram,
    sources: &RasterSources,
    frame_buffer: &mut [u16],
) {
    if !(VISIBLE_TOP_LINE..VBLANK_LINE).contains(&scanline) {
        return;
    }
    let row = (scanline - VISIBLE_TOP_LINE) as usize;
    let row_start = row * FRAME_WIDTH;
    let Some(row_buf) = frame_buffer.get_mut(row_start..row_start + FRAME_WIDTH) else {
        return;
    };

    let backdrop = sources.palette.backdrop_rgb565(sources.palette_bank);
    row_buf.fill(backdrop);

    let sprites = build_sprite_list(scanline, vram);
    for sprite in &sprites {
        raster_sprite(scanline, &sprite, vram, sources, row_buf);
    }

    render_fix_row(scanline, vram, sources, row_buf);
}

fn raster_sprite(
    scanline: u16,
    sprite: &SpriteOnLine,
    vram: &Vram,
    sources: &RasterSources,
    row: &mut [u16],
) {
    let mut l = ((scanline as i32) - (sprite.y as i32)).rem_euclid(512);
    let mut flip_v = (l & 0x100) != 0;
    l &= 0xFF;

    if sprite.vertical_size > 32 {
        let period = (sprite.zoom_y as i32 + 1) * 2;
        let mut l2 = l % period.max(1);
        if l2 > sprite.zoom_y as i32 {
            l2 = 2 * (sprite.zoom_y as i32 + 1) - 1 - l2;
            flip_v = !flip_v;
        }
        l = l2;
    }

    let rom_idx = (sprite.zoom_y as usize) * 256 + (l as usize & 0xFF);
    let packed = sources.y_zoom_rom.get(rom_idx).copied().unwrap_or(0);
    let tile_number = ((packed >> 5) & 0x07) as u16;
    let mut tile_line = (packed & 0x1F) as u8;
    if flip_v {
        tile_line ^= 0x1F;
    }

    // SCB1 pair: [tile index word, control word], 64 words per sprite.
    let base = sprite.index.wrapping_mul(64).wrapping_add(tile_number * 2);
    let tile_index_word = vram.peek(SCB1_START + base);
    let control = vram.peek(SCB1_START + base + 1);

    let h_flip = control & 0x01 != 0;
    let v_flip_tile = control & 0x02 != 0;
    let anim4 = control & 0x04 != 0;
    let anim8 = control & 0x08 != 0;
    let high_bits = (control >> 4) & 0x0F;
    let palette = (control >> 8) & 0xFF;

    if v_flip_tile {
        tile_line ^= 0x0F;
    }

    let mut tile_index = (tile_index_word as u32) | ((high_bits as u32) << 16);
    if anim8 {
        tile_index = (tile_index & !0x07) | (sources.auto_anim_counter as u32 & 0x07);
    } else if anim4 {
        tile_index = (tile_index & !0x03) | (sources.auto_anim_counter as u32 & 0x03);
    }

    let stride = crate::cart::TILE_STRIDE;
    let tile_base = (tile_index as usize) * stride + ((tile_line & 0x0F) as usize) * 8;

    let mut x_cursor = sprite.x as i32;
    for i in 0..16u8 {
        if !shrink_keep(sprite.zoom_x, i) {
            continue;
        }
        let byte_idx = tile_base + (i as usize / 2);
        let byte = sources.c_rom.get(byte_idx).copied().unwrap_or(0);
        let color_idx = if i & 1 == 0 { byte & 0x0F } else { (byte >> 4) & 0x0F };

        if color_idx != 0 && (0..FRAME_WIDTH as i32).contains(&x_cursor) {
            let palette_index = (palette as usize) * 16 + color_idx as usize;
            row[x_cursor as usize] = sources.palette.read_rgb565(sources.palette_bank, palette_index);
        }
        x_cursor += if h_flip { -1 } else { 1 };
    }
}

fn render_fix_row(scanline: u16, vram: &Vram, sources: &RasterSources, row: &mut [u16]) {
    let r = (scanline / 8) as u16;
    let y_in_tile = (scanline % 8) as u8;
    for c in 0..40u16 {
        let word = vram.peek(FIXMAP_START + c * 32 + r);
        let palette = ((word >> 12) & 0x0F) as usize;
        let tile_number = (word & 0x0FFF) as usize;

        const ODD_COLUMN_OFFSETS: [usize; 4] = [0x10, 0x18, 0x00, 0x08];
        let tile_base = tile_number * 32;

        for (sub, &offset) in ODD_COLUMN_OFFSETS.iter().enumerate() {
            let byte_offset = tile_base + offset + y_in_tile as usize;
            let byte = sources.s_rom.get(byte_offset).copied().unwrap_or(0);

            for px in 0..2u16 {
                let color_idx = if px == 0 { byte & 0x0F } else { (byte >> 4) & 0x0F };
                if color_idx == 0 {
                    continue;
                }
                let screen_x = c as i32 * 8 + sub as i32 * 2 + px as i32;
                if (0..FRAME_WIDTH as i32).contains(&screen_x) {
                    let palette_index = palette * 16 + color_idx as usize;
                    row[screen_x as usize] =
                        sources.palette.read_rgb565(sources.palette_bank, palette_index);
                }
            }
        }
    }
}
