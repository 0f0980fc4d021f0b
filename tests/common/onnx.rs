//! Writes small ONNX classifiers for tests.
//!
//! The graph mirrors a boosted-tree export: one float input of shape
//! [batch, n_features], a `probabilities` output of shape [batch, n_classes]
//! and an int64 `label` output. Scores come from MatMul + Add + Softmax.

const FLOAT: i64 = 1;
const INT64: i64 = 7;
const ATTRIBUTE_INT: i64 = 2;
const OPSET: i64 = 13;
const IR_VERSION: i64 = 8;

pub const INPUT_NAME: &str = "float_input";

/// Protobuf message under construction.
#[derive(Default)]
struct Message(Vec<u8>);

impl Message {
    fn varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.0.push(byte);
                return;
            }
            self.0.push(byte | 0x80);
        }
    }

    fn int(mut self, field: u64, value: i64) -> Self {
        self.varint(field << 3);
        self.varint(value as u64);
        self
    }

    fn bytes(mut self, field: u64, data: &[u8]) -> Self {
        self.varint((field << 3) | 2);
        self.varint(data.len() as u64);
        self.0.extend_from_slice(data);
        self
    }

    fn string(self, field: u64, value: &str) -> Self {
        self.bytes(field, value.as_bytes())
    }

    fn message(self, field: u64, inner: Message) -> Self {
        self.bytes(field, &inner.0)
    }
}

enum Dim {
    Fixed(i64),
    Batch,
}

fn value_info(name: &str, elem_type: i64, dims: &[Dim]) -> Message {
    let shape = dims.iter().fold(Message::default(), |shape, dim| {
        let dimension = match dim {
            Dim::Fixed(size) => Message::default().int(1, *size),
            Dim::Batch => Message::default().string(2, "batch"),
        };
        shape.message(1, dimension)
    });
    let tensor_type = Message::default().int(1, elem_type).message(2, shape);
    Message::default()
        .string(1, name)
        .message(2, Message::default().message(1, tensor_type))
}

fn float_tensor(name: &str, dims: &[i64], values: &[f32]) -> Message {
    let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    dims.iter()
        .fold(Message::default(), |tensor, &d| tensor.int(1, d))
        .int(2, FLOAT)
        .string(8, name)
        .bytes(9, &raw)
}

fn int_attribute(name: &str, value: i64) -> Message {
    Message::default().string(1, name).int(3, value).int(20, ATTRIBUTE_INT)
}

fn node(op_type: &str, inputs: &[&str], outputs: &[&str], attributes: Vec<Message>) -> Message {
    let node = inputs.iter().fold(Message::default(), |node, input| node.string(1, input));
    let node = outputs.iter().fold(node, |node, output| node.string(2, output));
    let node = node.string(3, &format!("{}_node", op_type)).string(4, op_type);
    attributes
        .into_iter()
        .fold(node, |node, attribute| node.message(5, attribute))
}

/// Serialized ONNX model scoring `softmax(x · coefficientsᵀ + intercept)`.
///
/// `coefficients` holds one row of weights per class. The probability output
/// is named `scores_name`; `label_first` decides whether the int64 label
/// output is declared before or after it.
pub fn linear_classifier(
    coefficients: &[Vec<f32>],
    intercept: &[f32],
    scores_name: &str,
    label_first: bool,
) -> Vec<u8> {
    let num_classes = coefficients.len();
    let num_features = coefficients[0].len();

    // MatMul wants [n_features, n_classes]
    let weights: Vec<f32> = (0..num_features)
        .flat_map(|f| coefficients.iter().map(move |row| row[f]))
        .collect();

    let nodes = vec![
        node("MatMul", &[INPUT_NAME, "weights"], &["weighted"], Vec::new()),
        node("Add", &["weighted", "intercept"], &["logits"], Vec::new()),
        node("Softmax", &["logits"], &[scores_name], vec![int_attribute("axis", -1)]),
        node(
            "ArgMax",
            &[scores_name],
            &["label"],
            vec![int_attribute("axis", 1), int_attribute("keepdims", 0)],
        ),
    ];

    let scores = value_info(scores_name, FLOAT, &[Dim::Batch, Dim::Fixed(num_classes as i64)]);
    let label = value_info("label", INT64, &[Dim::Batch]);
    let outputs = if label_first { vec![label, scores] } else { vec![scores, label] };

    let graph = nodes
        .into_iter()
        .fold(Message::default(), |graph, n| graph.message(1, n))
        .string(2, "linear_classifier")
        .message(
            5,
            float_tensor("weights", &[num_features as i64, num_classes as i64], &weights),
        )
        .message(5, float_tensor("intercept", &[num_classes as i64], intercept))
        .message(
            11,
            value_info(INPUT_NAME, FLOAT, &[Dim::Batch, Dim::Fixed(num_features as i64)]),
        );
    let graph = outputs.into_iter().fold(graph, |graph, o| graph.message(12, o));

    Message::default()
        .int(1, IR_VERSION)
        .string(2, "team-classifier-tests")
        .message(7, graph)
        .message(8, Message::default().string(1, "").int(2, OPSET))
        .0
}

