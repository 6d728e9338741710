use crate::Error;

/// Moving average over the most recent `capacity` samples.
///
/// The sum is maintained incrementally: once the window is full the evicted
/// sample is subtracted before the new one is added, so a push never rescans
/// the buffer. ADC readings are 16 bit integers and a full window sums to well
/// under 2^24, so the `f32` sum stays exact for them.
#[derive(Clone, Debug)]
pub struct RollingAverage<const N: usize> {
    buffer: [f32; N],
    capacity: usize,
    index: usize,
    count: usize,
    sum: f32,
    last: f32,
}

impl<const N: usize> RollingAverage<N> {
    /// Create an empty average over `capacity` samples
    ///
    /// capacity: Must be in `1..=N`
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 || capacity > N {
            return Err(Error::CapacityOutOfRange(capacity));
        }
        Ok(Self {
            buffer: [0.0; N],
            capacity,
            index: 0,
            count: 0,
            sum: 0.0,
            last: 0.0,
        })
    }

    /// Drop all samples
    pub fn reset(&mut self) {
        self.buffer = [0.0; N];
        self.index = 0;
        self.count = 0;
        self.sum = 0.0;
        self.last = 0.0;
    }

    /// Add a sample, evicting the oldest one once full
    ///
    /// Returns the new average
    pub fn push(&mut self, value: f32) -> f32 {
        if self.count < self.capacity {
            self.count += 1;
        } else {
            self.sum -= self.buffer[self.index];
        }

        self.buffer[self.index] = value;
        self.sum += value;

        self.index = (self.index + 1) % self.capacity;
        self.last = self.sum / self.count as f32;
        self.last
    }

    /// Push every value in order. Returns the final average.
    pub fn push_many<I>(&mut self, values: I) -> f32
    where
        I: IntoIterator<Item = f32>,
    {
        for value in values {
            self.push(value);
        }
        self.last
    }

    /// Average after the most recent push, 0 if empty
    pub fn last_average(&self) -> f32 {
        self.last
    }

    /// Live samples, oldest first
    pub fn history(&self) -> impl Iterator<Item = f32> + '_ {
        // Until the window wraps the oldest sample sits in slot 0
        let start = if self.count < self.capacity { 0 } else { self.index };
        (0..self.count).map(move |i| self.buffer[(start + i) % self.capacity])
    }

    pub fn sum(&self) -> f32 {
        self.sum
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
