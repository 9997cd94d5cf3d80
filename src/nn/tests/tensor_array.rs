/*
 * @Author       : 老董
 * @Date         : 2026-03-05
 * @Description  : TensorArray 单元测试：只追加写入、读取、堆叠
 */

use crate::nn::GraphError;
use crate::nn::decode::TensorArray;
use crate::tensor::Tensor;

#[test]
fn test_write_read_stack() -> Result<(), GraphError> {
    let mut array = TensorArray::new();
    assert!(array.is_empty());

    array.write(0, Tensor::new(&[1.0, 2.0], &[2]))?;
    array.write(1, Tensor::new(&[3.0, 4.0], &[2]))?;
    array.write(2, Tensor::new(&[5.0, 6.0], &[2]))?;
    assert_eq!(array.len(), 3);

    assert_eq!(array.read(1)?.data_as_slice(), &[3.0, 4.0]);

    let stacked = array.stack()?;
    assert_eq!(stacked.shape(), &[3, 2]);
    assert_eq!(stacked.data_as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    Ok(())
}

/// 只允许追加：跳索引或回写都报错
#[test]
fn test_write_must_append() -> Result<(), GraphError> {
    let mut array = TensorArray::new();
    array.write(0, Tensor::new(&[1.0], &[1]))?;

    assert!(matches!(
        array.write(2, Tensor::new(&[2.0], &[1])),
        Err(GraphError::InvalidOperation(_))
    ));
    assert!(matches!(
        array.write(0, Tensor::new(&[2.0], &[1])),
        Err(GraphError::InvalidOperation(_))
    ));
    Ok(())
}

#[test]
fn test_read_out_of_range() {
    let array = TensorArray::new();
    assert!(matches!(
        array.read(0),
        Err(GraphError::InvalidOperation(_))
    ));
}

#[test]
fn test_stack_empty_fails() {
    let array = TensorArray::new();
    assert!(matches!(
        array.stack(),
        Err(GraphError::InvalidOperation(_))
    ));
}
