//! Lock-free triple buffer shared between the simulation and a renderer.
//!
//! Three frames rotate through three roles:
//!
//! - **writing**: owned by the simulation, known only to [`SimWriter`].
//! - **ready**: the most recently published frame, header word
//!   [`HDR_READY`]. Only [`SimWriter::publish`] changes it.
//! - **reading**: the frame the renderer holds, header word
//!   [`HDR_READING`]. Only [`FrameReader::claim`] changes it.
//!
//! `writing` never equals `ready` or `reading`; `ready` and `reading`
//! coincide right after a claim. The writer picks its next frame as
//! whichever index is neither the new `ready` nor the current `reading`. The reader claims by storing `ready` into `reading`
//! and re-checking `ready`; if a publish slipped in between, it retries.
//! All role traffic is sequentially consistent, so a claim that survives its
//! re-check is always observed by the writer's next choice.
//!
//! The header and the three frames live in one contiguous word region: the
//! header at offset 0 and frame `n` at [`FrameLayout::frame_offset`].
//!
//! [`SharedMemory::split`] returns exactly one writer and one reader. Neither
//! handle is `Clone`, so there is a single producer and a single consumer by
//! construction.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::frame::{FrameMut, FrameView};
use crate::layout::{
    FRAME_COUNT, FrameLayout, HDR_READING, HDR_READY, HDR_RESOURCES, HDR_TICK, HEADER_SIZE,
    HEADER_WORDS,
};

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// The 64-byte shared header, viewed in place at the start of the region.
/// Each word has exactly one writer role.
#[derive(Debug)]
#[repr(transparent)]
pub struct Header {
    words: [AtomicU32; HEADER_WORDS],
}

impl Header {

    /// Number of ticks published so far.
    pub fn tick(&self) -> u32 {
        self.words[HDR_TICK].load(Ordering::Acquire)
    }

    /// Index of the most recently published frame.
    pub fn ready(&self) -> u32 {
        self.words[HDR_READY].load(Ordering::SeqCst)
    }

    /// Index of the frame the renderer has claimed.
    pub fn reading(&self) -> u32 {
        self.words[HDR_READING].load(Ordering::SeqCst)
    }

    /// Accumulated copper delivered to the core.
    pub fn resources(&self) -> u32 {
        self.words[HDR_RESOURCES].load(Ordering::Acquire)
    }

    /// Add to the resource counter. Simulation side only.
    pub fn add_resources(&self, amount: u32) -> u32 {
        self.words[HDR_RESOURCES].fetch_add(amount, Ordering::AcqRel) + amount
    }

    /// Copy of all header words, in layout order.
    pub fn snapshot(&self) -> [u32; HEADER_WORDS] {
        std::array::from_fn(|i| self.words[i].load(Ordering::SeqCst))
    }

    /// The header as raw bytes, in the documented layout.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let words = self.snapshot();
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(bytemuck::cast_slice(&words[..]));
        out
    }
}

// ---------------------------------------------------------------------------
// SharedMemory
// ---------------------------------------------------------------------------

/// The header plus three identically shaped frames in one allocation.
#[derive(Debug)]
pub struct SharedMemory {
    layout: FrameLayout,
    /// `layout.total_size() / 4` words: header, then frames 0, 1 and 2.
    region: Box<[AtomicU32]>,
    /// Tick at which each frame was last published.
    stamps: [AtomicU64; FRAME_COUNT],
}

impl SharedMemory {
    /// Allocate the region and hand out its single writer and single reader.
    ///
    /// The writer starts on frame 0, frame 1 is `ready` and the reader holds
    /// frame 2. All frames start zeroed (empty map, no entities).
    pub fn split(layout: FrameLayout) -> (SimWriter, FrameReader) {
        let region: Box<[AtomicU32]> = (0..layout.total_size() / 4)
            .map(|_| AtomicU32::new(0))
            .collect();
        region[HDR_READY].store(1, Ordering::SeqCst);
        region[HDR_READING].store(2, Ordering::SeqCst);

        let shared = Arc::new(Self {
            layout,
            region,
            stamps: std::array::from_fn(|_| AtomicU64::new(0)),
        });
        let writer = SimWriter {
            shared: Arc::clone(&shared),
            writing: 0,
        };
        let reader = FrameReader { shared, reading: 2 };
        (writer, reader)
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    pub fn header(&self) -> &Header {
        // SAFETY: `Header` is a transparent wrapper over
        // `[AtomicU32; HEADER_WORDS]` and the region always starts with that
        // many words.
        unsafe { &*self.region.as_ptr().cast::<Header>() }
    }

    /// Word offset and length of frame `index` inside the region.
    fn frame_span(&self, index: u32) -> (usize, usize) {
        let start = self.layout.frame_offset(index as usize) / 4;
        let len = self.layout.frame_words();
        debug_assert!(start + len <= self.region.len());
        (start, len)
    }

    /// Shared access to a frame's words.
    ///
    /// Callers must hold a role that keeps the writer off `index`.
    fn words(&self, index: u32) -> &[u32] {
        let (start, len) = self.frame_span(index);
        // SAFETY: the span lies inside the region, `AtomicU32` has the
        // layout of `u32`, and the caller's role excludes concurrent writes
        // to this frame.
        unsafe { std::slice::from_raw_parts(self.region.as_ptr().cast::<u32>().add(start), len) }
    }

    /// Exclusive access to a frame's words. Only the writer calls this, for
    /// its own `writing` index or the one it is about to take.
    #[allow(clippy::mut_from_ref)]
    fn words_mut(&self, index: u32) -> &mut [u32] {
        let (start, len) = self.frame_span(index);
        // SAFETY: the words sit behind `AtomicU32`'s interior mutability and
        // the role protocol keeps every other handle off this frame while
        // the writer holds it.
        unsafe {
            std::slice::from_raw_parts_mut(
                self.region.as_ptr().cast::<u32>().cast_mut().add(start),
                len,
            )
        }
    }
}

/// The one index in `0..3` different from both `a` and `b` (the lowest one
/// when `a == b`).
fn third_index(a: u32, b: u32) -> u32 {
    if a == b {
        if a == 0 { 1 } else { 0 }
    } else {
        3 - a - b
    }
}

// ---------------------------------------------------------------------------
// SimWriter
// ---------------------------------------------------------------------------

/// The simulation's handle: owns the `writing` role.
#[derive(Debug)]
pub struct SimWriter {
    shared: Arc<SharedMemory>,
    writing: u32,
}

impl SimWriter {
    pub fn layout(&self) -> &FrameLayout {
        &self.shared.layout
    }

    pub fn header(&self) -> &Header {
        self.shared.header()
    }

    /// Index of the frame currently being written.
    pub fn writing_index(&self) -> u32 {
        self.writing
    }

    /// The frame the simulation may freely mutate this tick.
    pub fn frame_mut(&mut self) -> FrameMut<'_> {
        let layout = self.shared.layout;
        FrameMut::from_words(layout, self.shared.words_mut(self.writing))
    }

    /// Read-only view of the frame being written.
    pub fn frame(&self) -> FrameView<'_> {
        let stamp = self.shared.stamps[self.writing as usize].load(Ordering::Relaxed);
        FrameView::from_words(self.shared.layout, self.shared.words(self.writing), stamp)
    }

    /// Raw bytes of the frame being written, in the documented layout.
    pub fn frame_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.shared.words(self.writing))
    }

    /// Copy of the whole region in the documented layout: the header at
    /// offset 0, then every frame at its `frame_offset`.
    pub fn region_bytes(&self) -> Vec<u8> {
        let layout = &self.shared.layout;
        let mut out = vec![0u8; layout.total_size()];
        out[..HEADER_SIZE].copy_from_slice(&self.header().to_bytes());
        for index in 0..FRAME_COUNT {
            let offset = layout.frame_offset(index);
            let words = self.shared.words(index as u32);
            out[offset..offset + layout.frame_size].copy_from_slice(bytemuck::cast_slice(words));
        }
        out
    }

    /// Publish the frame just written as `ready`, stamped with `tick`.
    ///
    /// Picks the next writing frame as the index that is neither the new
    /// `ready` nor the renderer's claim, then carries the published state
    /// forward into it so the next tick starts from the latest frame.
    pub fn publish(&mut self, tick: u64) {
        let header = self.shared.header();
        let finished = self.writing;
        debug_assert_ne!(
            finished,
            header.ready(),
            "writer is publishing the frame that is already ready"
        );

        self.shared.stamps[finished as usize].store(tick, Ordering::Relaxed);
        header.words[HDR_READY].swap(finished, Ordering::SeqCst);
        let reading = header.words[HDR_READING].load(Ordering::SeqCst);
        let next = third_index(finished, reading);
        debug_assert!(
            next != finished && next != reading,
            "triple buffer roles collided: writing={next} ready={finished} reading={reading}"
        );

        header.words[HDR_TICK].fetch_add(1, Ordering::AcqRel);

        let src = self.shared.words(finished);
        let dst = self.shared.words_mut(next);
        dst.copy_from_slice(src);
        self.shared.stamps[next as usize].store(tick, Ordering::Relaxed);
        self.writing = next;
    }
}

// ---------------------------------------------------------------------------
// FrameReader
// ---------------------------------------------------------------------------

/// The renderer's handle: owns the `reading` role.
#[derive(Debug)]
pub struct FrameReader {
    shared: Arc<SharedMemory>,
    reading: u32,
}

impl FrameReader {
    pub fn layout(&self) -> &FrameLayout {
        &self.shared.layout
    }

    pub fn header(&self) -> &Header {
        self.shared.header()
    }

    /// Index of the frame currently claimed.
    pub fn reading_index(&self) -> u32 {
        self.reading
    }

    /// Whether a newer frame than the claimed one has been published.
    pub fn has_update(&self) -> bool {
        self.shared.header().ready() != self.reading
    }

    /// Claim the newest published frame and return a view of it.
    ///
    /// Hold the returned view for the whole draw; call `claim` again only to
    /// start the next one. If nothing new was published, the same frame is
    /// returned.
    pub fn claim(&mut self) -> FrameView<'_> {
        let header = self.shared.header();
        loop {
            let ready = header.words[HDR_READY].load(Ordering::SeqCst);
            header.words[HDR_READING].store(ready, Ordering::SeqCst);
            if header.words[HDR_READY].load(Ordering::SeqCst) == ready {
                self.reading = ready;
                break;
            }
        }
        self.current()
    }

    /// View of the frame already claimed, without looking for a newer one.
    pub fn current(&self) -> FrameView<'_> {
        let stamp = self.shared.stamps[self.reading as usize].load(Ordering::Relaxed);
        FrameView::from_words(self.shared.layout, self.shared.words(self.reading), stamp)
    }

    /// Raw bytes of the claimed frame, in the documented layout.
    pub fn frame_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.shared.words(self.reading))
    }
}
