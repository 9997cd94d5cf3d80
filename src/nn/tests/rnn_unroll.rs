/*
 * @Author       : 老董
 * @Date         : 2026-03-07
 * @Description  : rnn（定长序列展开）单元测试：与逐步调用对照、
 *                 序列长度掩码冻结状态、时间反转的镜像性质
 */

use crate::nn::cell::{GruCell, RnnCell};
use crate::nn::structure::NestedStructure;
use crate::nn::{Graph, GraphError, rnn};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

/// 固定权重的 1x1 GRU，便于对照
fn fixed_gru(graph: &Graph, batch_size: usize) -> Result<GruCell, GraphError> {
    let gru = GruCell::new(graph, 1, 1, batch_size, None)?;
    graph.set_node_value(gru.w_ux, Some(&Tensor::new(&[0.5], &[1, 1])))?;
    graph.set_node_value(gru.w_uh, Some(&Tensor::new(&[0.2], &[1, 1])))?;
    graph.set_node_value(gru.w_rx, Some(&Tensor::new(&[1.0], &[1, 1])))?;
    graph.set_node_value(gru.w_rh, Some(&Tensor::new(&[0.3], &[1, 1])))?;
    graph.set_node_value(gru.w_cx, Some(&Tensor::new(&[1.0], &[1, 1])))?;
    graph.set_node_value(gru.w_ch, Some(&Tensor::new(&[0.7], &[1, 1])))?;
    Ok(gru)
}

/// rnn 的输出应与逐步调用 cell.call 一致
#[test]
fn test_rnn_matches_stepwise_calls() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let gru = fixed_gru(&graph, 2)?;

    // [batch=2, seq=3, dim=1]
    let inputs_data = [0.1f32, 0.2, 0.3, -0.1, -0.2, -0.3];
    let inputs = NestedStructure::leaf(Tensor::new(&inputs_data, &[2, 3, 1]));

    let (outputs, final_states) = rnn(&gru, &inputs, None, None, false, false)?;

    // 逐步对照
    let mut states = NestedStructure::leaf(Tensor::zeros(&[2, 1]));
    let mut expected_steps = Vec::new();
    for t in 0..3 {
        let x = Tensor::new(&[inputs_data[t], inputs_data[3 + t]], &[2, 1]);
        let (out, new_states) = gru.call(&NestedStructure::leaf(x), &states)?;
        expected_steps.push(out.as_leaf()?.clone());
        states = new_states;
    }

    let stacked = outputs.as_leaf()?; // [batch=2, seq=3, 1]
    assert_eq!(stacked.shape(), &[2, 3, 1]);
    for t in 0..3 {
        for b in 0..2 {
            assert_abs_diff_eq!(
                stacked[[b, t, 0]],
                expected_steps[t][[b, 0]],
                epsilon = 1e-6
            );
        }
    }

    let final_h = final_states.as_leaf()?;
    for b in 0..2 {
        assert_abs_diff_eq!(
            final_h[[b, 0]],
            states.as_leaf()?[[b, 0]],
            epsilon = 1e-6
        );
    }
    Ok(())
}

/// 提供 sequence_length 时，超过真实长度的时间步状态被冻结
#[test]
fn test_rnn_sequence_length_freezes_state() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let gru = fixed_gru(&graph, 2)?;

    let inputs_data = [0.5f32, 0.5, 0.5, 0.5, 0.5, 0.5];
    let inputs = NestedStructure::leaf(Tensor::new(&inputs_data, &[2, 3, 1]));
    let lengths = Tensor::new(&[1.0, 3.0], &[2]);

    let (_, final_states) = rnn(&gru, &inputs, None, Some(&lengths), false, false)?;
    let final_h = final_states.as_leaf()?;

    // 样本0的最终状态应等于只跑一步的状态
    let one_step = {
        let x = Tensor::new(&[0.5, 0.5], &[2, 1]);
        let init = NestedStructure::leaf(Tensor::zeros(&[2, 1]));
        let (_, s) = gru.call(&NestedStructure::leaf(x), &init)?;
        s.as_leaf()?[[0, 0]]
    };
    assert_abs_diff_eq!(final_h[[0, 0]], one_step, epsilon = 1e-6);

    // 样本1跑满3步，最终状态与样本0不同
    assert!((final_h[[1, 0]] - final_h[[0, 0]]).abs() > 1e-4);
    Ok(())
}

/// 反转性质：reverse(rnn(reverse(x))) == rnn(x, is_reverse=true)
#[test]
fn test_rnn_reverse_involution() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let gru = fixed_gru(&graph, 1)?;

    let inputs_data = [0.1f32, 0.4, -0.2];
    let inputs = NestedStructure::leaf(Tensor::new(&inputs_data, &[1, 3, 1]));

    let (rev_outputs, _) = rnn(&gru, &inputs, None, None, false, true)?;

    // 手动：反转输入、正向展开、再反转输出
    let reversed_data = [-0.2f32, 0.4, 0.1];
    let reversed_inputs = NestedStructure::leaf(Tensor::new(&reversed_data, &[1, 3, 1]));
    let (fwd_outputs, _) = rnn(&gru, &reversed_inputs, None, None, false, false)?;
    let expected = fwd_outputs.as_leaf()?.reverse_axis(1);

    let actual = rev_outputs.as_leaf()?;
    assert_eq!(actual.shape(), expected.shape());
    for t in 0..3 {
        assert_abs_diff_eq!(actual[[0, t, 0]], expected[[0, t, 0]], epsilon = 1e-6);
    }
    Ok(())
}

/// time_major 布局：输入输出的首维都是时间维
#[test]
fn test_rnn_time_major_layout() -> Result<(), GraphError> {
    let graph = Graph::new_with_seed(42);
    let gru = fixed_gru(&graph, 2)?;

    let data_bm = [0.1f32, 0.2, 0.3, -0.1, -0.2, -0.3]; // [2, 3, 1]
    let data_tm = [0.1f32, -0.1, 0.2, -0.2, 0.3, -0.3]; // [3, 2, 1]

    let (out_bm, _) = rnn(
        &gru,
        &NestedStructure::leaf(Tensor::new(&data_bm, &[2, 3, 1])),
        None,
        None,
        false,
        false,
    )?;
    let (out_tm, _) = rnn(
        &gru,
        &NestedStructure::leaf(Tensor::new(&data_tm, &[3, 2, 1])),
        None,
        None,
        true,
        false,
    )?;

    let bm = out_bm.as_leaf()?;
    let tm = out_tm.as_leaf()?;
    assert_eq!(bm.shape(), &[2, 3, 1]);
    assert_eq!(tm.shape(), &[3, 2, 1]);
    for b in 0..2 {
        for t in 0..3 {
            assert_abs_diff_eq!(bm[[b, t, 0]], tm[[t, b, 0]], epsilon = 1e-6);
        }
    }
    Ok(())
}
