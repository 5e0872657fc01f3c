use crate::error::{BoxError, Result};

/// Remove the element at `source` and reinsert it at `destination`,
/// shifting the elements in between.
///
/// Both indices must address an existing element; nothing is clamped.
pub fn move_element<T>(seq: &mut Vec<T>, source: usize, destination: usize) -> Result<()> {
    let len = seq.len();
    for index in [source, destination] {
        if index >= len {
            return Err(BoxError::IndexOutOfRange { index, len });
        }
    }
    let moved = seq.remove(source);
    seq.insert(destination, moved);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_first_to_last() {
        let mut v = vec!['A', 'B', 'C'];
        move_element(&mut v, 0, 2).unwrap();
        assert_eq!(v, vec!['B', 'C', 'A']);
    }

    #[test]
    fn moves_last_to_first() {
        let mut v = vec![1, 2, 3, 4];
        move_element(&mut v, 3, 0).unwrap();
        assert_eq!(v, vec![4, 1, 2, 3]);
    }

    #[test]
    fn same_index_is_identity() {
        let mut v = vec![1, 2, 3];
        move_element(&mut v, 1, 1).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn every_valid_pair_is_a_single_move() {
        let base: Vec<usize> = (0..6).collect();
        for src in 0..base.len() {
            for dst in 0..base.len() {
                let mut v = base.clone();
                move_element(&mut v, src, dst).unwrap();

                let mut expected = base.clone();
                let x = expected.remove(src);
                expected.insert(dst, x);
                assert_eq!(v, expected, "src={} dst={}", src, dst);
                assert_eq!(v.len(), base.len());
            }
        }
    }

    #[test]
    fn out_of_range_is_rejected_and_leaves_sequence_alone() {
        let mut v = vec![1, 2, 3];
        let err = move_element(&mut v, 3, 0).unwrap_err();
        assert!(matches!(err, BoxError::IndexOutOfRange { index: 3, len: 3 }));
        let err = move_element(&mut v, 0, 7).unwrap_err();
        assert!(matches!(err, BoxError::IndexOutOfRange { index: 7, len: 3 }));
        assert_eq!(v, vec![1, 2, 3]);

        let mut empty: Vec<u8> = vec![];
        assert!(move_element(&mut empty, 0, 0).is_err());
    }
}
