/*
 * @Author       : 老董
 * @Date         : 2026-03-05
 * @Description  : NestedStructure 单元测试：同构校验、展平/重组往返、
 *                 逐叶映射、遍历顺序契约
 */

use crate::nn::{GraphError, NestedStructure};
use crate::tensor::Tensor;

fn sample_structure() -> NestedStructure {
    // Map{ a: Leaf, b: Seq[Leaf, Map{c: Leaf}] }
    NestedStructure::map(vec![
        ("a", NestedStructure::leaf(Tensor::new(&[1.0], &[1]))),
        (
            "b",
            NestedStructure::seq(vec![
                NestedStructure::leaf(Tensor::new(&[2.0, 3.0], &[2])),
                NestedStructure::map(vec![(
                    "c",
                    NestedStructure::leaf(Tensor::new(&[4.0], &[1])),
                )]),
            ]),
        ),
    ])
}

/// 同构结构的校验应当通过（叶子内容无关）
#[test]
fn test_same_structure_accepts() -> Result<(), GraphError> {
    let a = sample_structure();
    // 叶子值不同但容器形状一致
    let b = a.map_structure(&mut |t| Ok(t * 2.0))?;
    NestedStructure::assert_same_structure(&a, &b)?;
    Ok(())
}

/// 结构分歧时应报出首个分歧路径
#[test]
fn test_same_structure_reports_first_divergent_path() {
    let a = sample_structure();
    // 把 b[1] 的 Map 换成 Leaf
    let b = NestedStructure::map(vec![
        ("a", NestedStructure::leaf(Tensor::new(&[1.0], &[1]))),
        (
            "b",
            NestedStructure::seq(vec![
                NestedStructure::leaf(Tensor::new(&[2.0, 3.0], &[2])),
                NestedStructure::leaf(Tensor::new(&[4.0], &[1])),
            ]),
        ),
    ]);

    let err = NestedStructure::assert_same_structure(&a, &b).unwrap_err();
    match err {
        GraphError::StructureMismatch { path, .. } => {
            assert_eq!(path, "<root>.b[1]");
        }
        other => panic!("期望StructureMismatch，但得到{other:?}"),
    }
}

/// 序列长度不一致
#[test]
fn test_same_structure_rejects_different_lengths() {
    let a = NestedStructure::seq(vec![
        NestedStructure::leaf(Tensor::new(&[1.0], &[1])),
        NestedStructure::leaf(Tensor::new(&[2.0], &[1])),
    ]);
    let b = NestedStructure::seq(vec![NestedStructure::leaf(Tensor::new(&[1.0], &[1]))]);
    assert!(matches!(
        NestedStructure::assert_same_structure(&a, &b),
        Err(GraphError::StructureMismatch { .. })
    ));
}

/// Map 键不一致（键序即契约）
#[test]
fn test_same_structure_rejects_different_keys() {
    let a = NestedStructure::map(vec![(
        "x",
        NestedStructure::leaf(Tensor::new(&[1.0], &[1])),
    )]);
    let b = NestedStructure::map(vec![(
        "y",
        NestedStructure::leaf(Tensor::new(&[1.0], &[1])),
    )]);
    assert!(matches!(
        NestedStructure::assert_same_structure(&a, &b),
        Err(GraphError::StructureMismatch { .. })
    ));
}

/// 往返律：pack_sequence_as(s, flatten(s)) == s
#[test]
fn test_flatten_pack_roundtrip() -> Result<(), GraphError> {
    let s = sample_structure();
    let leaves = s.flatten().into_iter().cloned().collect::<Vec<_>>();
    let rebuilt = NestedStructure::pack_sequence_as(&s, leaves)?;
    assert_eq!(s, rebuilt);
    Ok(())
}

/// 叶子数量不符时重组应报错
#[test]
fn test_pack_wrong_arity() {
    let s = sample_structure();
    let result = NestedStructure::pack_sequence_as(&s, vec![Tensor::new(&[1.0], &[1])]);
    assert!(matches!(
        result,
        Err(GraphError::StructureMismatch { .. })
    ));
}

/// 恒等映射律：map_structure(identity, s) == s
#[test]
fn test_identity_map() -> Result<(), GraphError> {
    let s = sample_structure();
    let mapped = s.map_structure(&mut |t| Ok(t.clone()))?;
    assert_eq!(s, mapped);
    Ok(())
}

/// 展平顺序契约：深度优先，Seq 按下标序、Map 按键序
#[test]
fn test_flatten_order_is_deterministic() {
    let s = sample_structure();
    let leaves = s.flatten();
    assert_eq!(leaves.len(), 3);
    // a -> b[0] -> b[1].c
    assert_eq!(leaves[0].data_as_slice(), &[1.0]);
    assert_eq!(leaves[1].data_as_slice(), &[2.0, 3.0]);
    assert_eq!(leaves[2].data_as_slice(), &[4.0]);
}

/// map_structure2 要求两个输入同构
#[test]
fn test_map2_requires_same_structure() {
    let a = sample_structure();
    let b = NestedStructure::leaf(Tensor::new(&[1.0], &[1]));
    let result = NestedStructure::map_structure2(&a, &b, &mut |x, _| Ok(x.clone()));
    assert!(matches!(
        result,
        Err(GraphError::StructureMismatch { .. })
    ));
}

/// map_structure2 逐叶对应
#[test]
fn test_map2_pairs_leaves() -> Result<(), GraphError> {
    let a = sample_structure();
    let b = a.map_structure(&mut |t| Ok(t * 10.0))?;
    let sum = NestedStructure::map_structure2(&a, &b, &mut |x, y| Ok(x + y))?;
    let leaves = sum.flatten();
    assert_eq!(leaves[0].data_as_slice(), &[11.0]);
    assert_eq!(leaves[1].data_as_slice(), &[22.0, 33.0]);
    assert_eq!(leaves[2].data_as_slice(), &[44.0]);
    Ok(())
}
