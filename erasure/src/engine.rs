use itertools::Itertools;
use tracing::{debug, instrument};

use crate::error::Error;
use crate::matrix::{encoding_matrix, Matrix};
use crate::processor::{accumulate_row, apply_row};

// GF(2^8) has 256 elements, which caps the number of distinct encoding rows
pub const MAX_TOTAL_SHARDS: usize = 256;

/// Reed-Solomon encoder/reconstructor for a fixed (data, parity) shard
/// configuration.
///
/// Holds nothing but the immutable encoding matrix, so one engine can be
/// shared by any number of threads encoding or reconstructing different
/// shard sets concurrently.
pub struct Engine {
    data_shards: usize,
    parity_shards: usize,
    total_shards: usize,
    matrix: Matrix,
}

impl Engine {
    pub fn new(data_shards: usize, parity_shards: usize) -> Result<Self, Error> {
        if data_shards == 0 || parity_shards == 0 {
            return Err(Error::InvalidConfiguration);
        }
        let total_shards = data_shards + parity_shards;
        if total_shards > MAX_TOTAL_SHARDS {
            return Err(Error::InvalidConfiguration);
        }

        let matrix = encoding_matrix(data_shards, total_shards)?;
        debug!(data_shards, parity_shards, "Built encoding matrix");

        Ok(Engine {
            data_shards,
            parity_shards,
            total_shards,
            matrix,
        })
    }

    pub fn data_shard_count(&self) -> usize {
        self.data_shards
    }

    pub fn parity_shard_count(&self) -> usize {
        self.parity_shards
    }

    pub fn total_shard_count(&self) -> usize {
        self.total_shards
    }

    /// Computes all parity shards from the data shards.
    ///
    /// `shards` holds the k data shards followed by the m parity slots.
    /// Parity slots may arrive empty (they are allocated to the data shard
    /// length) or pre-allocated to the same length; only parity slots are
    /// written.
    #[instrument(skip_all)]
    pub fn encode(&self, shards: &mut [Vec<u8>]) -> Result<(), Error> {
        if shards.len() != self.total_shards {
            return Err(Error::ShapeMismatch);
        }
        let shard_size = shards[0].len();
        if shards[..self.data_shards]
            .iter()
            .any(|shard| shard.len() != shard_size)
        {
            return Err(Error::ShapeMismatch);
        }
        if shards[self.data_shards..]
            .iter()
            .any(|shard| !shard.is_empty() && shard.len() != shard_size)
        {
            return Err(Error::ShapeMismatch);
        }

        let (data, parity) = shards.split_at_mut(self.data_shards);
        let inputs: Vec<&[u8]> = data.iter().map(|shard| shard.as_slice()).collect();
        for (r, out) in parity.iter_mut().enumerate() {
            out.resize(shard_size, 0);
            apply_row(self.matrix.row(self.data_shards + r), &inputs, out);
        }

        Ok(())
    }

    /// Folds a single data shard into the parity accumulators.
    ///
    /// Incremental counterpart of [`encode`](Self::encode) for callers that
    /// receive data shards one at a time: parity must be zero-initialized
    /// before the first call, and parity is valid once every index in
    /// `0..data_shard_count()` has been applied exactly once. Applying the
    /// same index twice double-counts that shard's contribution; the engine
    /// does not track which indexes it has seen.
    pub fn encode_idx(
        &self,
        data_shard: &[u8],
        index: usize,
        parity: &mut [Vec<u8>],
    ) -> Result<(), Error> {
        if index >= self.data_shards || parity.len() != self.parity_shards {
            return Err(Error::ShapeMismatch);
        }
        if parity.iter().any(|shard| shard.len() != data_shard.len()) {
            return Err(Error::ShapeMismatch);
        }

        for (r, out) in parity.iter_mut().enumerate() {
            accumulate_row(self.matrix.get(self.data_shards + r, index), data_shard, out);
        }

        Ok(())
    }

    /// Recomputes all missing shards in place.
    ///
    /// `None` slots are the missing shards; at least k entries must be
    /// present. Present shards are left untouched, including the choice of
    /// which survivors feed the solver: the first k present slots in
    /// increasing index order, so the output is deterministic for a given
    /// loss pattern.
    #[instrument(skip_all)]
    pub fn reconstruct(&self, shards: &mut [Option<Vec<u8>>]) -> Result<(), Error> {
        if shards.len() != self.total_shards {
            return Err(Error::ShapeMismatch);
        }

        let present = shards.iter().positions(|shard| shard.is_some()).collect_vec();
        if present.len() < self.data_shards {
            return Err(Error::TooFewShards);
        }

        let shard_size = match shards.iter().flatten().next() {
            Some(shard) => shard.len(),
            None => return Err(Error::TooFewShards),
        };
        if shards.iter().flatten().any(|shard| shard.len() != shard_size) {
            return Err(Error::ShapeMismatch);
        }
        if present.len() == self.total_shards {
            return Ok(());
        }

        debug!(
            missing = self.total_shards - present.len(),
            total = self.total_shards,
            "Reconstructing shards"
        );

        // Solve for the data shards: the survivors are the encoding matrix
        // rows at the selected indices applied to the original data, so the
        // inverse of that square submatrix maps survivors back to data.
        let selected = &present[..self.data_shards];
        let decode_matrix = self.matrix.sub_matrix(selected).invert()?;

        let survivors: Vec<&[u8]> = shards
            .iter()
            .flatten()
            .take(self.data_shards)
            .map(|shard| shard.as_slice())
            .collect();
        let mut recovered = Vec::new();
        for index in 0..self.data_shards {
            if shards[index].is_none() {
                let mut shard = vec![0; shard_size];
                apply_row(decode_matrix.row(index), &survivors, &mut shard);
                recovered.push((index, shard));
            }
        }
        drop(survivors);
        for (index, shard) in recovered {
            shards[index] = Some(shard);
        }

        // Missing parity is re-derived from the now-complete data shards
        let data: Vec<&[u8]> = shards[..self.data_shards]
            .iter()
            .flatten()
            .map(|shard| shard.as_slice())
            .collect();
        let mut recomputed = Vec::new();
        for index in self.data_shards..self.total_shards {
            if shards[index].is_none() {
                let mut shard = vec![0; shard_size];
                apply_row(self.matrix.row(index), &data, &mut shard);
                recomputed.push((index, shard));
            }
        }
        drop(data);
        for (index, shard) in recomputed {
            shards[index] = Some(shard);
        }

        Ok(())
    }

    /// Checks that the parity shards are consistent with the data shards
    /// under the encoding matrix. Recomputes parity into scratch buffers and
    /// compares; nothing is mutated. Data shard content is not validated
    /// against anything external.
    pub fn verify(&self, shards: &[Vec<u8>]) -> Result<bool, Error> {
        if shards.len() != self.total_shards {
            return Err(Error::ShapeMismatch);
        }
        let shard_size = shards[0].len();
        if shards.iter().any(|shard| shard.len() != shard_size) {
            return Err(Error::ShapeMismatch);
        }

        let inputs: Vec<&[u8]> = shards[..self.data_shards]
            .iter()
            .map(|shard| shard.as_slice())
            .collect();
        let mut scratch = vec![0; shard_size];
        for r in self.data_shards..self.total_shards {
            apply_row(self.matrix.row(r), &inputs, &mut scratch);
            if scratch != shards[r] {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use rand::{thread_rng, Rng};

    fn random_shard(size: usize) -> Vec<u8> {
        let mut rng = thread_rng();
        (0..size).map(|_| rng.gen()).collect()
    }

    // Data shards plus correct parity, ready to damage
    fn encoded_set(engine: &Engine, shard_size: usize) -> Vec<Vec<u8>> {
        let mut shards: Vec<Vec<u8>> = (0..engine.data_shard_count())
            .map(|_| random_shard(shard_size))
            .collect();
        shards.resize(engine.total_shard_count(), Vec::new());
        engine.encode(&mut shards).unwrap();
        shards
    }

    #[test]
    fn test_configuration_limits() {
        assert_eq!(Engine::new(0, 2).err(), Some(Error::InvalidConfiguration));
        assert_eq!(Engine::new(3, 0).err(), Some(Error::InvalidConfiguration));
        assert_eq!(Engine::new(255, 2).err(), Some(Error::InvalidConfiguration));
        assert!(Engine::new(255, 1).is_ok());
        assert!(Engine::new(128, 128).is_ok());
    }

    #[test]
    fn test_encode_allocates_parity() {
        let engine = Engine::new(3, 2).unwrap();
        let mut shards = vec![
            vec![0, 1, 2, 3],
            vec![4, 5, 6, 7],
            vec![8, 9, 10, 11],
            Vec::new(),
            Vec::new(),
        ];
        engine.encode(&mut shards).unwrap();

        assert!(shards.iter().all(|shard| shard.len() == 4));
        assert!(engine.verify(&shards).unwrap());
    }

    #[test]
    fn test_encode_shape_checks() {
        let engine = Engine::new(3, 2).unwrap();

        let mut short_set = vec![vec![0; 8]; 4];
        assert_eq!(engine.encode(&mut short_set), Err(Error::ShapeMismatch));

        let mut uneven = vec![vec![0; 8], vec![0; 8], vec![0; 7], Vec::new(), Vec::new()];
        assert_eq!(engine.encode(&mut uneven), Err(Error::ShapeMismatch));

        let mut bad_parity = vec![vec![0; 8], vec![0; 8], vec![0; 8], vec![0; 3], Vec::new()];
        assert_eq!(engine.encode(&mut bad_parity), Err(Error::ShapeMismatch));
    }

    #[test]
    fn test_recover_lost_data_and_parity() {
        // 3 + 2 coding; one lost data shard plus one lost parity shard is
        // still correctable
        let engine = Engine::new(3, 2).unwrap();
        let mut shards = vec![
            vec![0, 1, 2, 3],
            vec![4, 5, 6, 7],
            vec![8, 9, 10, 11],
            Vec::new(),
            Vec::new(),
        ];
        engine.encode(&mut shards).unwrap();

        let mut holed: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
        holed[0] = None;
        holed[4] = None;
        engine.reconstruct(&mut holed).unwrap();

        let restored: Vec<Vec<u8>> = holed.into_iter().flatten().collect();
        assert_eq!(restored[0], vec![0, 1, 2, 3]);
        assert_eq!(restored, shards);
        assert!(engine.verify(&restored).unwrap());
    }

    #[test]
    fn test_round_trip_all_loss_patterns() {
        let engine = Engine::new(3, 2).unwrap();
        let shards = encoded_set(&engine, 64);

        for lost in (0..5usize).powerset().filter(|set| set.len() <= 2) {
            let mut holed: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
            for &index in &lost {
                holed[index] = None;
            }
            engine.reconstruct(&mut holed).unwrap();

            let restored: Vec<Vec<u8>> = holed.into_iter().flatten().collect();
            assert_eq!(restored, shards, "loss pattern {:?}", lost);
            assert!(engine.verify(&restored).unwrap());
        }
    }

    #[test]
    fn test_reconstruct_boundaries() {
        let engine = Engine::new(3, 2).unwrap();
        let shards = encoded_set(&engine, 32);

        // Exactly k survivors is enough
        let mut holed: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
        holed[1] = None;
        holed[3] = None;
        engine.reconstruct(&mut holed).unwrap();
        let restored: Vec<Vec<u8>> = holed.into_iter().flatten().collect();
        assert_eq!(restored, shards);

        // k - 1 survivors is unrecoverable
        let mut holed: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
        holed[0] = None;
        holed[2] = None;
        holed[4] = None;
        assert_eq!(engine.reconstruct(&mut holed), Err(Error::TooFewShards));
    }

    #[test]
    fn test_reconstruct_shape_checks() {
        let engine = Engine::new(3, 2).unwrap();

        let mut wrong_count: Vec<Option<Vec<u8>>> = vec![Some(vec![0; 8]); 4];
        assert_eq!(engine.reconstruct(&mut wrong_count), Err(Error::ShapeMismatch));

        let mut uneven: Vec<Option<Vec<u8>>> = vec![
            Some(vec![0; 8]),
            Some(vec![0; 9]),
            Some(vec![0; 8]),
            Some(vec![0; 8]),
            None,
        ];
        assert_eq!(engine.reconstruct(&mut uneven), Err(Error::ShapeMismatch));
    }

    #[test]
    fn test_encode_idx_matches_batch_encode() {
        let engine = Engine::new(4, 3).unwrap();
        let shard_size = 256;
        let data: Vec<Vec<u8>> = (0..4).map(|_| random_shard(shard_size)).collect();

        let mut batch = data.clone();
        batch.resize(7, Vec::new());
        engine.encode(&mut batch).unwrap();

        let mut parity = vec![vec![0; shard_size]; 3];
        for (index, shard) in data.iter().enumerate() {
            engine.encode_idx(shard, index, &mut parity).unwrap();
        }

        assert_eq!(&batch[4..], parity.as_slice());
    }

    #[test]
    fn test_encode_idx_shape_checks() {
        let engine = Engine::new(3, 2).unwrap();
        let data = vec![0; 16];

        let mut parity = vec![vec![0; 16]; 2];
        assert_eq!(
            engine.encode_idx(&data, 3, &mut parity),
            Err(Error::ShapeMismatch)
        );

        let mut wrong_count = vec![vec![0; 16]; 3];
        assert_eq!(
            engine.encode_idx(&data, 0, &mut wrong_count),
            Err(Error::ShapeMismatch)
        );

        let mut uneven = vec![vec![0; 16], vec![0; 8]];
        assert_eq!(
            engine.encode_idx(&data, 0, &mut uneven),
            Err(Error::ShapeMismatch)
        );
    }

    #[test]
    fn test_verify_detects_any_parity_corruption() {
        let engine = Engine::new(3, 2).unwrap();
        let shards = encoded_set(&engine, 8);

        for shard in 3..5 {
            for byte in 0..8 {
                for bit in 0..8 {
                    let mut corrupted = shards.clone();
                    corrupted[shard][byte] ^= 1 << bit;
                    assert!(!engine.verify(&corrupted).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_verify_detects_data_corruption() {
        let engine = Engine::new(4, 2).unwrap();
        let mut shards = encoded_set(&engine, 16);

        shards[1][5] ^= 0x40;
        assert!(!engine.verify(&shards).unwrap());
    }

    #[test]
    fn test_verify_is_idempotent_and_pure() {
        let engine = Engine::new(3, 2).unwrap();
        let shards = encoded_set(&engine, 100);

        let snapshot = shards.clone();
        let first = engine.verify(&shards).unwrap();
        let second = engine.verify(&shards).unwrap();
        assert_eq!(first, second);
        assert!(first);
        assert_eq!(shards, snapshot);
    }

    #[test]
    fn test_verify_shape_checks() {
        let engine = Engine::new(3, 2).unwrap();
        assert_eq!(engine.verify(&vec![vec![0; 4]; 4]), Err(Error::ShapeMismatch));
        let mut uneven = vec![vec![0; 4]; 5];
        uneven[2] = vec![0; 5];
        assert_eq!(engine.verify(&uneven), Err(Error::ShapeMismatch));
    }

    #[test]
    fn test_large_random_round_trip() {
        use rand::SeedableRng;
        use rand_chacha::ChaCha20Rng;

        // 16 KiB split across 4 data shards, 2 parity; every 2-shard loss
        // pattern must restore the full set byte for byte
        let engine = Engine::new(4, 2).unwrap();
        let rng = &mut ChaCha20Rng::seed_from_u64(0x5eed);
        let shard_size = 16 * 1024 / 4;
        let mut shards: Vec<Vec<u8>> = (0..4)
            .map(|_| (0..shard_size).map(|_| rng.gen()).collect())
            .collect();
        shards.resize(engine.total_shard_count(), Vec::new());
        engine.encode(&mut shards).unwrap();

        for lost in (0..6usize).combinations(2) {
            let mut holed: Vec<Option<Vec<u8>>> = shards.iter().cloned().map(Some).collect();
            for &index in &lost {
                holed[index] = None;
            }
            engine.reconstruct(&mut holed).unwrap();

            let restored: Vec<Vec<u8>> = holed.into_iter().flatten().collect();
            assert_eq!(restored, shards, "loss pattern {:?}", lost);
        }
    }

    #[test]
    fn test_engine_is_shared_across_threads() {
        let engine = std::sync::Arc::new(Engine::new(4, 2).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    let shards = encoded_set(&engine, 4096);
                    let mut holed: Vec<Option<Vec<u8>>> =
                        shards.iter().cloned().map(Some).collect();
                    holed[2] = None;
                    holed[5] = None;
                    engine.reconstruct(&mut holed).unwrap();
                    let restored: Vec<Vec<u8>> = holed.into_iter().flatten().collect();
                    assert_eq!(restored, shards);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
