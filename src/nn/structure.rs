/*
 * @Author       : 老董
 * @Date         : 2026-02-18
 * @Description  : 嵌套张量结构（NestedStructure）：
 *                 叶子为张量，容器为有序序列（Seq）或有序键值映射（Map）。
 *                 所有循环单元状态、解码器状态/输出都用它描述，
 *                 “新状态与旧状态同构”是贯穿全库的硬性不变量。
 *
 *                 展平（flatten）的遍历顺序是显式契约：深度优先，
 *                 Seq 按下标序、Map 按存储的键序，绝不依赖语言环境的迭代顺序。
 */

use crate::nn::GraphError;
use crate::tensor::Tensor;

/// 嵌套张量结构：Leaf（张量叶子）| Seq（有序序列）| Map（有序键值映射）
#[derive(Debug, Clone, PartialEq)]
pub enum NestedStructure {
    Leaf(Tensor),
    Seq(Vec<NestedStructure>),
    /// 键序即插入序，展平/对比时按此序遍历
    Map(Vec<(String, NestedStructure)>),
}

impl NestedStructure {
    pub fn leaf(tensor: Tensor) -> Self {
        Self::Leaf(tensor)
    }

    pub fn seq(children: Vec<NestedStructure>) -> Self {
        Self::Seq(children)
    }

    pub fn map(entries: Vec<(&str, NestedStructure)>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// 取出叶子张量；本结构不是叶子时报错
    pub fn as_leaf(&self) -> Result<&Tensor, GraphError> {
        match self {
            Self::Leaf(t) => Ok(t),
            _ => Err(GraphError::StructureMismatch {
                path: "<root>".to_string(),
                message: "期望叶子张量，但得到容器结构".to_string(),
            }),
        }
    }

    /// 按键查找 Map 容器的子结构
    pub fn get(&self, key: &str) -> Result<&NestedStructure, GraphError> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .ok_or_else(|| GraphError::StructureMismatch {
                    path: format!("<root>.{key}"),
                    message: format!("Map 容器中不存在键 {key}"),
                }),
            _ => Err(GraphError::StructureMismatch {
                path: "<root>".to_string(),
                message: "期望 Map 容器".to_string(),
            }),
        }
    }

    // ========== 展平与重组 ==========

    /// 深度优先展平为叶子序列（Seq 按下标序、Map 按键序）
    pub fn flatten(&self) -> Vec<&Tensor> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a Tensor>) {
        match self {
            Self::Leaf(t) => leaves.push(t),
            Self::Seq(children) => {
                for child in children {
                    child.collect_leaves(leaves);
                }
            }
            Self::Map(entries) => {
                for (_, child) in entries {
                    child.collect_leaves(leaves);
                }
            }
        }
    }

    /// 以`template`的形状重组`leaves`（按与`flatten`相同的顺序消耗）。
    /// 叶子数量与模板不符时报错。
    pub fn pack_sequence_as(
        template: &NestedStructure,
        leaves: Vec<Tensor>,
    ) -> Result<NestedStructure, GraphError> {
        let expected = template.flatten().len();
        if leaves.len() != expected {
            return Err(GraphError::StructureMismatch {
                path: "<root>".to_string(),
                message: format!(
                    "重组需要{expected}个叶子张量，但提供了{}个",
                    leaves.len()
                ),
            });
        }
        let mut iter = leaves.into_iter();
        Ok(Self::pack_internal(template, &mut iter))
    }

    fn pack_internal(
        template: &NestedStructure,
        leaves: &mut std::vec::IntoIter<Tensor>,
    ) -> NestedStructure {
        match template {
            Self::Leaf(_) => Self::Leaf(leaves.next().unwrap()),
            Self::Seq(children) => Self::Seq(
                children
                    .iter()
                    .map(|child| Self::pack_internal(child, leaves))
                    .collect(),
            ),
            Self::Map(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(k, child)| (k.clone(), Self::pack_internal(child, leaves)))
                    .collect(),
            ),
        }
    }

    // ========== 同构校验 ==========

    /// 校验两个结构的容器形状（类型/长度/键集）在每一层都一致，
    /// 不一致时报出首个分歧路径。叶子内容不参与比较。
    pub fn assert_same_structure(a: &Self, b: &Self) -> Result<(), GraphError> {
        Self::assert_same_internal(a, b, "<root>")
    }

    fn assert_same_internal(a: &Self, b: &Self, path: &str) -> Result<(), GraphError> {
        match (a, b) {
            (Self::Leaf(_), Self::Leaf(_)) => Ok(()),
            (Self::Seq(xs), Self::Seq(ys)) => {
                if xs.len() != ys.len() {
                    return Err(GraphError::StructureMismatch {
                        path: path.to_string(),
                        message: format!("序列长度不一致：{} 与 {}", xs.len(), ys.len()),
                    });
                }
                for (i, (x, y)) in xs.iter().zip(ys.iter()).enumerate() {
                    Self::assert_same_internal(x, y, &format!("{path}[{i}]"))?;
                }
                Ok(())
            }
            (Self::Map(xs), Self::Map(ys)) => {
                if xs.len() != ys.len() {
                    return Err(GraphError::StructureMismatch {
                        path: path.to_string(),
                        message: format!("映射大小不一致：{} 与 {}", xs.len(), ys.len()),
                    });
                }
                for ((kx, x), (ky, y)) in xs.iter().zip(ys.iter()) {
                    if kx != ky {
                        return Err(GraphError::StructureMismatch {
                            path: path.to_string(),
                            message: format!("映射键不一致：{kx} 与 {ky}"),
                        });
                    }
                    Self::assert_same_internal(x, y, &format!("{path}.{kx}"))?;
                }
                Ok(())
            }
            _ => Err(GraphError::StructureMismatch {
                path: path.to_string(),
                message: format!("容器类型不一致：{} 与 {}", a.kind_name(), b.kind_name()),
            }),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "Leaf",
            Self::Seq(_) => "Seq",
            Self::Map(_) => "Map",
        }
    }

    // ========== 逐叶映射 ==========

    /// 对每个叶子应用`f`，返回同构的新结构
    pub fn map_structure<F>(&self, f: &mut F) -> Result<NestedStructure, GraphError>
    where
        F: FnMut(&Tensor) -> Result<Tensor, GraphError>,
    {
        match self {
            Self::Leaf(t) => Ok(Self::Leaf(f(t)?)),
            Self::Seq(children) => Ok(Self::Seq(
                children
                    .iter()
                    .map(|child| child.map_structure(f))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Self::Map(entries) => Ok(Self::Map(
                entries
                    .iter()
                    .map(|(k, child)| Ok((k.clone(), child.map_structure(f)?)))
                    .collect::<Result<Vec<_>, GraphError>>()?,
            )),
        }
    }

    /// 对两个同构结构的对应叶子应用`f`，返回同构的新结构；
    /// 两者不同构时报 StructureMismatch。
    pub fn map_structure2<F>(
        a: &Self,
        b: &Self,
        f: &mut F,
    ) -> Result<NestedStructure, GraphError>
    where
        F: FnMut(&Tensor, &Tensor) -> Result<Tensor, GraphError>,
    {
        Self::assert_same_structure(a, b)?;
        let leaves_b = b.flatten();
        let mut index = 0usize;
        a.map_structure(&mut |ta| {
            let tb = leaves_b[index];
            index += 1;
            f(ta, tb)
        })
    }
}

// ========== 状态形状模板 ==========

/// 状态形状模板：与 NestedStructure 同形的“形状树”。
/// 叶子是“单实例”特征形状（不含批维），合成初始状态时统一把批大小
/// 插到每个叶子形状的最前面。“形状的列表”和“列表的形状”靠独立类型
/// 区分，不依赖任何运行期的序列判定谓词。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateShape {
    Leaf(Vec<usize>),
    Seq(Vec<StateShape>),
    Map(Vec<(String, StateShape)>),
}

impl StateShape {
    pub fn leaf(shape: &[usize]) -> Self {
        Self::Leaf(shape.to_vec())
    }

    pub fn seq(children: Vec<StateShape>) -> Self {
        Self::Seq(children)
    }

    /// 对每个叶子形状应用`f`（通常用于按形状合成填充张量），
    /// 返回与模板同构的 NestedStructure
    pub fn map_to_structure<F>(&self, f: &mut F) -> Result<NestedStructure, GraphError>
    where
        F: FnMut(&[usize]) -> Result<Tensor, GraphError>,
    {
        match self {
            Self::Leaf(shape) => Ok(NestedStructure::Leaf(f(shape)?)),
            Self::Seq(children) => Ok(NestedStructure::Seq(
                children
                    .iter()
                    .map(|child| child.map_to_structure(f))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Self::Map(entries) => Ok(NestedStructure::Map(
                entries
                    .iter()
                    .map(|(k, child)| Ok((k.clone(), child.map_to_structure(f)?)))
                    .collect::<Result<Vec<_>, GraphError>>()?,
            )),
        }
    }
}
