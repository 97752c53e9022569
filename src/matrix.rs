use thiserror::Error;

/// Row-major 4x4 transform, laid out like Maya's `MMatrix` (`m[row][col]`, translation in row 3).
pub type Matrix = [[f64; 4]; 4];

pub const IDENTITY: Matrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("a 4x4 matrix needs exactly 16 elements, got {found}")]
    ElementCount { found: usize },
}

/// Regroups a flat, row-major sequence of 16 elements into 4 rows of 4.
///
/// No numeric work is done, so this works for any element type. Anything other than exactly
/// 16 elements is rejected rather than truncated.
pub fn convert_matrix_to_4x4_list<T, I>(values: I) -> Result<Vec<[T; 4]>, MatrixError>
where
    I: IntoIterator<Item = T>,
{
    let values: Vec<T> = values.into_iter().collect();
    if values.len() != 16 {
        return Err(MatrixError::ElementCount {
            found: values.len(),
        });
    }

    let mut rows = Vec::with_capacity(4);
    let mut iter = values.into_iter();
    while let (Some(a), Some(b), Some(c), Some(d)) =
        (iter.next(), iter.next(), iter.next(), iter.next())
    {
        rows.push([a, b, c, d]);
    }
    Ok(rows)
}

/// Builds a matrix from the flat list returned by `xform -query -matrix`.
pub fn matrix_from_flat(values: &[f64]) -> Result<Matrix, MatrixError> {
    let rows = convert_matrix_to_4x4_list(values.iter().copied())?;
    let mut m = IDENTITY;
    for (dst, src) in m.iter_mut().zip(rows) {
        *dst = src;
    }
    Ok(m)
}

pub fn flatten(m: &Matrix) -> impl Iterator<Item = f64> + '_ {
    m.iter().flat_map(|row| row.iter().copied())
}

/// Converts a Maya transform into Unreal Engine's axis convention.
///
/// Follows the sign table used by Autodesk's Maya/Unreal LiveLink plugin
/// (`MayaUnrealLiveLinkUtils.cpp`). The consuming engine expects these exact signs.
pub fn build_ue_transform_from_maya_transform(m: &Matrix) -> Matrix {
    let mut out = IDENTITY;
    for (i, row) in m.iter().enumerate() {
        out[i] = if i == 1 {
            [-row[0], row[1], -row[2], -row[3]]
        } else {
            [row[0], -row[1], row[2], row[3]]
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_unchanged() {
        assert_eq!(build_ue_transform_from_maya_transform(&IDENTITY), IDENTITY);
    }

    #[test]
    fn all_ones_follow_row_sign_table() {
        let ones = [[1.0; 4]; 4];
        let converted = build_ue_transform_from_maya_transform(&ones);
        assert_eq!(converted[1], [-1.0, 1.0, -1.0, -1.0]);
        for i in [0, 2, 3] {
            assert_eq!(converted[i], [1.0, -1.0, 1.0, 1.0], "row {}", i);
        }
    }

    #[test]
    fn translation_flips_y() {
        let mut m = IDENTITY;
        m[3] = [10.0, 20.0, 30.0, 1.0];
        let converted = build_ue_transform_from_maya_transform(&m);
        assert_eq!(converted[3], [10.0, -20.0, 30.0, 1.0]);
    }

    #[test]
    fn reshape_keeps_order_for_any_element_type() {
        let rows = convert_matrix_to_4x4_list(0..16).unwrap();
        assert_eq!(
            rows,
            vec![
                [0, 1, 2, 3],
                [4, 5, 6, 7],
                [8, 9, 10, 11],
                [12, 13, 14, 15]
            ]
        );

        let names: Vec<String> = (0..16).map(|i| format!("e{}", i)).collect();
        let rows = convert_matrix_to_4x4_list(names).unwrap();
        assert_eq!(rows[2][1], "e9");
    }

    #[test]
    fn reshape_rejects_wrong_length() {
        assert_eq!(
            convert_matrix_to_4x4_list(0..15),
            Err(MatrixError::ElementCount { found: 15 })
        );
        assert_eq!(
            matrix_from_flat(&[0.0; 17]),
            Err(MatrixError::ElementCount { found: 17 })
        );
    }
}
