use crate::tensor::Tensor;

#[test]
fn test_add_same_shape() {
    let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    let b = Tensor::new(&[10.0, 20.0, 30.0, 40.0], &[2, 2]);
    let c = &a + &b;
    assert_eq!(c.data_as_slice(), &[11.0, 22.0, 33.0, 44.0]);
}

#[test]
fn test_add_scalar() {
    let a = Tensor::new(&[1.0, 2.0], &[2]);
    assert_eq!((&a + 1.5).data_as_slice(), &[2.5, 3.5]);
    assert_eq!((1.5 + &a).data_as_slice(), &[2.5, 3.5]);
}

/// 广播：[2, 2] + [1, 2]（偏置风格）
#[test]
fn test_add_broadcast_bias() {
    let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    let bias = Tensor::new(&[10.0, 20.0], &[1, 2]);
    let c = &a + &bias;
    assert_eq!(c.shape(), &[2, 2]);
    assert_eq!(c.data_as_slice(), &[11.0, 22.0, 13.0, 24.0]);
}

/// 双向广播：[2, 1, 3] + [1, 2, 1] -> [2, 2, 3]
#[test]
fn test_add_two_way_broadcast() {
    let a = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 1, 3]);
    let b = Tensor::new(&[10.0, 20.0], &[1, 2, 1]);
    let c = &a + &b;
    assert_eq!(c.shape(), &[2, 2, 3]);
    assert_eq!(
        c.data_as_slice(),
        &[11.0, 12.0, 13.0, 21.0, 22.0, 23.0, 14.0, 15.0, 16.0, 24.0, 25.0, 26.0]
    );
}

#[test]
#[should_panic]
fn test_add_incompatible_shapes() {
    let a = Tensor::new(&[1.0, 2.0, 3.0], &[3]);
    let b = Tensor::new(&[1.0, 2.0], &[2]);
    let _ = &a + &b;
}

#[test]
fn test_sub() {
    let a = Tensor::new(&[1.0, 2.0], &[2]);
    let b = Tensor::new(&[0.5, 1.0], &[2]);
    assert_eq!((&a - &b).data_as_slice(), &[0.5, 1.0]);
    // mask-1 风格：(mask - 1)
    let mask = Tensor::new(&[1.0, 0.0], &[2]);
    assert_eq!((&mask - 1.0).data_as_slice(), &[0.0, -1.0]);
    assert_eq!((1.0 - &mask).data_as_slice(), &[0.0, 1.0]);
}
