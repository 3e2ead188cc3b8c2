//! Planar audio frames and the buffer pool they are allocated from.

/// Largest run handed to a plugin in one call.  Some plugins crash when fed
/// more samples at once, so longer blocks are processed in chunks.
pub const MAX_CHUNK_SAMPLES: usize = 4096;

/// Timeline position of the block being processed, used to evaluate
/// animated parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockContext {
    pub position: i64,
    pub length: i64,
}

/// Allocator for sample buffers.  Hosts with a pooled allocator plug it in
/// here; [`HeapPool`] simply uses the heap.
pub trait BufferPool {
    /// A zeroed buffer of `len` samples.
    fn alloc(&self, len: usize) -> Vec<f32>;
    fn release(&self, buffer: Vec<f32>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeapPool;

impl BufferPool for HeapPool {
    fn alloc(&self, len: usize) -> Vec<f32> {
        vec![0.0; len]
    }

    fn release(&self, buffer: Vec<f32>) {
        drop(buffer);
    }
}

/// One block of planar `f32` audio: channel `c` occupies
/// `data[c * samples..(c + 1) * samples]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    data: Vec<f32>,
    channels: usize,
    samples: usize,
}

impl AudioFrame {
    pub fn new(channels: usize, samples: usize) -> Self {
        Self {
            data: vec![0.0; channels * samples],
            channels,
            samples,
        }
    }

    /// Wrap planar data.  Returns `None` if the length does not match.
    pub fn from_planar(data: Vec<f32>, channels: usize, samples: usize) -> Option<Self> {
        (data.len() == channels * samples).then_some(Self {
            data,
            channels,
            samples,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn channel(&self, c: usize) -> Option<&[f32]> {
        (c < self.channels).then(|| &self.data[c * self.samples..(c + 1) * self.samples])
    }

    pub fn channel_mut(&mut self, c: usize) -> Option<&mut [f32]> {
        if c < self.channels {
            Some(&mut self.data[c * self.samples..(c + 1) * self.samples])
        } else {
            None
        }
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Grow the frame to `channels` planes.  The original planes keep
    /// their data and the new ones are silent.  The replaced buffer goes
    /// back to `pool`.  Never shrinks.
    pub fn pad_channels(&mut self, channels: usize, pool: &dyn BufferPool) {
        if channels <= self.channels {
            return;
        }
        let mut padded = pool.alloc(channels * self.samples);
        padded.resize(channels * self.samples, 0.0);
        let old_len = self.data.len();
        padded[..old_len].copy_from_slice(&self.data);
        padded[old_len..].fill(0.0);

        let old = std::mem::replace(&mut self.data, padded);
        self.channels = channels;
        pool.release(old);
    }

    /// Time-sliced view of every channel: `len` samples starting at
    /// `offset`, backed by the frame's own storage.
    pub fn planes_mut(&mut self, offset: usize, len: usize) -> PlanesMut<'_> {
        PlanesMut::new(&mut self.data, self.samples, offset, len)
    }
}

/// `len` samples at `offset` in each plane of a planar buffer.  Plane `c`
/// is `data[c * stride + offset..][..len]`; nothing is copied and no
/// per-plane slice list is built.
#[derive(Debug)]
pub struct PlanesMut<'a> {
    data: &'a mut [f32],
    stride: usize,
    offset: usize,
    len: usize,
}

impl<'a> PlanesMut<'a> {
    /// Clamps the window so every plane stays within `stride`.
    pub fn new(data: &'a mut [f32], stride: usize, offset: usize, len: usize) -> Self {
        let offset = offset.min(stride);
        let len = len.min(stride - offset);
        Self {
            data,
            stride,
            offset,
            len,
        }
    }

    /// Number of planes.
    pub fn count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    /// Samples per plane.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of the window inside the full block.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn plane(&self, c: usize) -> Option<&[f32]> {
        let start = c.checked_mul(self.stride)? + self.offset;
        self.data.get(start..start + self.len)
    }

    pub fn plane_mut(&mut self, c: usize) -> Option<&mut [f32]> {
        let start = c.checked_mul(self.stride)? + self.offset;
        self.data.get_mut(start..start + self.len)
    }

    /// Planes `first..first + count` as a view of their own.
    pub fn sub(&mut self, first: usize, count: usize) -> Option<PlanesMut<'_>> {
        let start = first.checked_mul(self.stride)?;
        let end = (first + count).checked_mul(self.stride)?;
        let data = self.data.get_mut(start..end)?;
        Some(PlanesMut {
            data,
            stride: self.stride,
            offset: self.offset,
            len: self.len,
        })
    }
}

/// Chunk boundaries `(offset, len)` covering `samples`.
pub fn chunks(samples: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..samples)
        .step_by(MAX_CHUNK_SAMPLES)
        .map(move |offset| (offset, MAX_CHUNK_SAMPLES.min(samples - offset)))
}
