/*!

The one-time bootstrap script pushed to a freshly created Cloud9 instance over Run Command.

!*/

const KUBECTL_URL: &str =
    "https://amazon-eks.s3.us-west-2.amazonaws.com/1.21.2/2021-07-05/bin/linux/amd64/kubectl";
const EKSCTL_URL: &str =
    "https://github.com/weaveworks/eksctl/releases/latest/download/eksctl_$(uname -s)_amd64.tar.gz";
const HELM_URL: &str = "https://get.helm.sh/helm-v3.7.1-linux-amd64.tar.gz";

/// The size the instance's root volume is grown to, in GiB.
const ROOT_VOLUME_SIZE_GIB: u32 = 30;

/// Assemble the bootstrap command list: install kubectl, eksctl and helm, point the
/// kubeconfig at the workshop cluster, grow the root volume, and reboot so the resized volume
/// takes effect.
pub fn bootstrap_commands(
    cluster_name: &str,
    region: &str,
    instance_id: &str,
    instance_role_arn: &str,
) -> Vec<String> {
    vec![
        format!("curl -sSL -o /tmp/kubectl {}", KUBECTL_URL),
        "chmod +x /tmp/kubectl".to_string(),
        "mv /tmp/kubectl /usr/local/bin/kubectl".to_string(),
        format!(
            "su -l -c 'aws eks update-kubeconfig --name {} --region {} --role-arn {}' ec2-user",
            cluster_name, region, instance_role_arn
        ),
        format!(
            "su -l -c 'echo \"export AWS_DEFAULT_REGION={}\" >> ~/.bash_profile' ec2-user",
            region
        ),
        format!(
            "su -l -c 'echo \"export AWS_REGION={}\" >> ~/.bash_profile' ec2-user",
            region
        ),
        format!("curl --silent --location \"{}\" | tar xz -C /tmp", EKSCTL_URL),
        "chmod +x /tmp/eksctl".to_string(),
        "mv /tmp/eksctl /usr/local/bin".to_string(),
        "yum -y install jq gettext bash-completion moreutils".to_string(),
        "/usr/local/bin/kubectl completion bash > /etc/bash_completion.d/kubectl".to_string(),
        "/usr/local/bin/eksctl completion bash > /etc/bash_completion.d/eksctl".to_string(),
        "su -l -c 'echo \"alias k=kubectl\" >> ~/.bash_profile' ec2-user".to_string(),
        "su -l -c 'echo \"complete -F __start_kubectl k\" >> ~/.bash_profile' ec2-user".to_string(),
        format!("curl -fsSL -o /tmp/helm.tgz {}", HELM_URL),
        "tar -C /tmp -xzf /tmp/helm.tgz".to_string(),
        "mv /tmp/linux-amd64/helm /usr/local/bin/helm".to_string(),
        "rm -rf /tmp/helm.tgz /tmp/linux-amd64".to_string(),
        format!(
            "volume_id=$(aws --region {} ec2 describe-volumes --filters Name=attachment.instance-id,Values={} --query 'Volumes[0].VolumeId' --output text)",
            region, instance_id
        ),
        format!(
            "aws --region {} ec2 modify-volume --volume-id $volume_id --size {}",
            region, ROOT_VOLUME_SIZE_GIB
        ),
        "reboot".to_string(),
    ]
}
